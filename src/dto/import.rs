//! Shape handed over by the roster-paste matcher once aliases are resolved.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::{validate_display_name, validate_registry_id};

/// League season a pasted roster header refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeasonType {
    Apertura,
    Clausura,
    Summer,
    #[serde(other)]
    Other,
}

impl SeasonType {
    /// Name shown on screens for the season.
    pub fn display_name(self) -> &'static str {
        match self {
            SeasonType::Apertura => "Apertura",
            SeasonType::Clausura => "Clausura",
            SeasonType::Summer => "Summer Cup",
            SeasonType::Other => "Torneo",
        }
    }
}

/// Registry player a pasted line was matched to.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegistryPlayer {
    #[validate(custom(function = "validate_registry_id"))]
    pub id: String,
    /// Official name; used instead of the pasted alias.
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MatchedEntry {
    #[validate(nested)]
    pub player: RegistryPlayer,
    /// Alias as it appeared in the pasted text.
    pub display_name: String,
}

/// Header line detected at the top of the pasted roster.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DetectedHeader {
    pub season_type: Option<SeasonType>,
    pub event_number: Option<u32>,
    pub total_events: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RosterImportRequest {
    #[validate(nested)]
    pub matched_entries: Vec<MatchedEntry>,
    #[serde(default)]
    pub detected_header: Option<DetectedHeader>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RosterImportResponse {
    /// Players registered by this import.
    pub added: usize,
    /// Whether the event metadata was updated from the header.
    pub header_applied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_seasons_fall_back_to_generic_name() {
        let header: DetectedHeader = serde_json::from_value(json!({
            "season_type": "winter",
            "event_number": 3,
            "total_events": null
        }))
        .unwrap();
        assert_eq!(header.season_type, Some(SeasonType::Other));
        assert_eq!(SeasonType::Other.display_name(), "Torneo");
        assert_eq!(SeasonType::Summer.display_name(), "Summer Cup");
    }

    #[test]
    fn nested_entries_are_validated() {
        let request: RosterImportRequest = serde_json::from_value(json!({
            "matched_entries": [
                { "player": { "id": "p-1", "name": " " }, "display_name": "el flaco" }
            ]
        }))
        .unwrap();
        assert!(request.validate().is_err());
        assert!(request.detected_header.is_none());
    }
}
