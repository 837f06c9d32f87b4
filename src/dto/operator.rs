//! DTO definitions used by the operator REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::{validate_display_name, validate_registry_id},
    state::stats::MAX_BUY_IN,
};

/// Register one player for the running event.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddPlayerRequest {
    /// Reference into the external player registry.
    #[validate(custom(function = "validate_registry_id"))]
    pub player_id: String,
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
}

/// Eliminate a player, optionally at an explicit finishing position.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct EliminateRequest {
    #[validate(range(min = 1))]
    #[serde(default)]
    pub position: Option<u32>,
}

/// Partial update of the event metadata. Absent fields are left untouched, `null` clears.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TournamentInfoRequest {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub event_id: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub tournament_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub season_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<u32>)]
    pub event_number: Option<Option<u32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<u32>)]
    pub total_events: Option<Option<u32>>,
}

impl TournamentInfoRequest {
    /// True when the request carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.event_id.is_none()
            && self.tournament_name.is_none()
            && self.season_name.is_none()
            && self.event_number.is_none()
            && self.total_events.is_none()
    }
}

/// Change the buy-in used for the prize pool.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BuyInRequest {
    #[validate(range(min = 1, max = MAX_BUY_IN))]
    pub amount: u64,
}

/// Generic action acknowledgement used by operator endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Returned after registering a player.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerCreatedResponse {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn buy_in_is_bounded() {
        assert!(BuyInRequest { amount: 20_000 }.validate().is_ok());
        assert!(BuyInRequest { amount: 0 }.validate().is_err());
        assert!(BuyInRequest { amount: MAX_BUY_IN + 1 }.validate().is_err());
    }

    #[test]
    fn tournament_info_distinguishes_null_from_absent() {
        let request: TournamentInfoRequest =
            serde_json::from_value(json!({ "event_id": null, "event_number": 4 })).unwrap();
        assert_eq!(request.event_id, Some(None));
        assert_eq!(request.event_number, Some(Some(4)));
        assert_eq!(request.tournament_name, None);
        assert!(!request.is_empty());

        let empty: TournamentInfoRequest = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn eliminate_position_must_be_positive() {
        let request = EliminateRequest { position: Some(0) };
        assert!(request.validate().is_err());
        assert!(EliminateRequest::default().validate().is_ok());
    }

    #[test]
    fn add_player_rejects_blank_names() {
        let request = AddPlayerRequest {
            player_id: "p-1".into(),
            name: "  ".into(),
        };
        assert!(request.validate().is_err());
    }
}
