//! Applies a roster already matched against the player registry.

use tracing::info;

use crate::{
    dto::{
        import::{RosterImportRequest, RosterImportResponse},
        operator::TournamentInfoRequest,
    },
    error::ServiceError,
    services::command_service,
    state::SharedState,
};

/// Event metadata derived from the pasted header, when it names both season and event.
pub fn header_info(request: &RosterImportRequest) -> Option<TournamentInfoRequest> {
    let header = request.detected_header.as_ref()?;
    let season = header.season_type?;
    let event_number = header.event_number?;

    Some(TournamentInfoRequest {
        tournament_name: Some(Some(season.display_name().to_string())),
        event_number: Some(Some(event_number)),
        total_events: header.total_events.map(Some),
        ..TournamentInfoRequest::default()
    })
}

/// Set the event metadata from the header, then register every matched player
/// under the registry's official name.
pub async fn import_roster(
    state: &SharedState,
    request: RosterImportRequest,
) -> Result<RosterImportResponse, ServiceError> {
    state.require_store().await?;

    let header = header_info(&request);
    let header_applied = header.is_some();
    if let Some(info) = header {
        command_service::set_tournament_info(state, info).await?;
    }

    let mut added = 0;
    for entry in request.matched_entries {
        command_service::add_player(state, entry.player.id, entry.player.name).await?;
        added += 1;
    }

    info!(added, header_applied, "roster imported");
    Ok(RosterImportResponse {
        added,
        header_applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(header: serde_json::Value) -> RosterImportRequest {
        serde_json::from_value(json!({ "matched_entries": [], "detected_header": header }))
            .unwrap()
    }

    #[test]
    fn header_sets_name_number_and_total() {
        let info = header_info(&request(json!({
            "season_type": "clausura",
            "event_number": 7,
            "total_events": 12
        })))
        .unwrap();
        assert_eq!(info.tournament_name, Some(Some("Clausura".to_string())));
        assert_eq!(info.event_number, Some(Some(7)));
        assert_eq!(info.total_events, Some(Some(12)));
        assert_eq!(info.event_id, None);
    }

    #[test]
    fn missing_total_leaves_it_untouched() {
        let info = header_info(&request(json!({
            "season_type": "summer",
            "event_number": 2,
            "total_events": null
        })))
        .unwrap();
        assert_eq!(info.tournament_name, Some(Some("Summer Cup".to_string())));
        assert_eq!(info.total_events, None);
    }

    #[test]
    fn incomplete_header_is_ignored() {
        assert!(header_info(&request(json!({ "season_type": "apertura" }))).is_none());
        assert!(header_info(&request(json!(null))).is_none());
    }
}
