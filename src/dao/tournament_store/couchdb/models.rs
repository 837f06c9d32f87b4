use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::dao::models::{PlayerEntryEntity, TournamentStateEntity};

pub const STATE_PREFIX: &str = "state::";
pub const PLAYER_PREFIX: &str = "player::";
pub const END_SUFFIX: &str = "\u{ffff}";

pub fn state_doc_id(id: Uuid) -> String {
    format!("{STATE_PREFIX}{id}")
}

pub fn player_doc_id(id: Uuid) -> String {
    format!("{PLAYER_PREFIX}{id}")
}

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchStateDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub state: TournamentStateEntity,
}

impl From<(TournamentStateEntity, Option<String>)> for CouchStateDocument {
    fn from((state, rev): (TournamentStateEntity, Option<String>)) -> Self {
        Self {
            id: state_doc_id(state.id),
            rev,
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchPlayerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub entry: PlayerEntryEntity,
}

impl From<(PlayerEntryEntity, Option<String>)> for CouchPlayerDocument {
    fn from((entry, rev): (PlayerEntryEntity, Option<String>)) -> Self {
        Self {
            id: player_doc_id(entry.id),
            rev,
            entry,
        }
    }
}

/// Subset of `GET /{db}` used to anchor the change feed.
#[derive(Debug, Deserialize)]
pub struct DatabaseInfo {
    pub update_seq: Value,
}

/// Response of `GET /{db}/_changes`.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    #[serde(default)]
    pub results: Vec<ChangeRow>,
    pub last_seq: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Sequence tokens are strings on CouchDB 2+ and integers before.
pub fn seq_token(seq: &Value) -> String {
    match seq {
        Value::String(token) => token.clone(),
        other => other.to_string(),
    }
}

/// Drop CouchDB bookkeeping members so only row columns remain.
pub fn strip_meta(doc: Value) -> Option<Map<String, Value>> {
    match doc {
        Value::Object(mut map) => {
            map.retain(|key, _| !key.starts_with('_'));
            Some(map)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn database_info_exposes_update_seq() {
        let info: DatabaseInfo =
            serde_json::from_value(json!({ "db_name": "live", "update_seq": "7-g1AAAA" }))
                .unwrap();
        assert_eq!(seq_token(&info.update_seq), "7-g1AAAA");
    }

    #[test]
    fn meta_members_are_stripped() {
        let map = strip_meta(json!({ "_id": "state::x", "_rev": "1-a", "is_paused": true }))
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["is_paused"], Value::Bool(true));
    }

    #[test]
    fn seq_tokens_accept_both_shapes() {
        assert_eq!(seq_token(&json!("12-abc")), "12-abc");
        assert_eq!(seq_token(&json!(42)), "42");
    }
}
