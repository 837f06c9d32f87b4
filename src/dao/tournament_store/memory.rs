//! In-process store sharing one session between every [`AppState`](crate::state::AppState)
//! holding a clone of it. Used on single-host setups and throughout the tests.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::{StreamExt, future::BoxFuture};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::warn;
use uuid::Uuid;

use crate::dao::{
    models::{PlayerEntryEntity, PlayerPatch, StatePatch, TournamentStateEntity},
    storage::{StorageError, StorageResult},
    tournament_store::{ChangeFeed, StoreChange, TournamentStore},
};

const CHANGE_CAPACITY: usize = 256;

#[derive(Default)]
struct Tables {
    states: IndexMap<Uuid, TournamentStateEntity>,
    players: IndexMap<Uuid, PlayerEntryEntity>,
}

impl Tables {
    fn roster_of(&self, state_id: Uuid) -> Vec<PlayerEntryEntity> {
        let mut rows: Vec<_> = self
            .players
            .values()
            .filter(|entry| entry.state_id == state_id)
            .cloned()
            .collect();
        rows.sort_by_key(|entry| entry.created_at);
        rows
    }
}

struct Inner {
    tables: RwLock<Tables>,
    changes: broadcast::Sender<(Uuid, StoreChange)>,
    available: AtomicBool,
}

/// Store keeping every row in memory and fanning changes out over a broadcast channel.
#[derive(Clone)]
pub struct MemoryTournamentStore {
    inner: Arc<Inner>,
}

impl Default for MemoryTournamentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTournamentStore {
    /// Empty store.
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                changes,
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Simulate an outage: while unavailable every operation fails.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self, operation: &str) -> StorageResult<()> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable(
                format!("memory store offline during {operation}"),
                io::Error::new(io::ErrorKind::NotConnected, "store offline"),
            ))
        }
    }

    fn publish_state(&self, entity: &TournamentStateEntity) {
        if let Some(row) = to_row(entity) {
            let _ = self
                .inner
                .changes
                .send((entity.id, StoreChange::State(row)));
        }
    }

    fn publish_roster(&self, state_id: Uuid, rows: Vec<PlayerEntryEntity>) {
        let rows = rows
            .iter()
            .filter_map(|row| serde_json::to_value(row).ok())
            .collect();
        let _ = self
            .inner
            .changes
            .send((state_id, StoreChange::Roster(rows)));
    }
}

fn to_row(value: &impl Serialize) -> Option<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            warn!(kind = ?other, "state row did not serialize to an object");
            None
        }
        Err(err) => {
            warn!(error = %err, "failed to serialize state row");
            None
        }
    }
}

impl TournamentStore for MemoryTournamentStore {
    fn read_current(&self) -> BoxFuture<'static, StorageResult<Option<TournamentStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("read_current")?;
            let tables = store.inner.tables.read().await;
            Ok(tables
                .states
                .values()
                .max_by_key(|state| state.updated_at)
                .cloned())
        })
    }

    fn create_state(&self, state: TournamentStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("create_state")?;
            let mut tables = store.inner.tables.write().await;
            tables.states.insert(state.id, state.clone());
            store.publish_state(&state);
            Ok(())
        })
    }

    fn write_partial(&self, id: Uuid, patch: StatePatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("write_partial")?;
            let mut tables = store.inner.tables.write().await;
            let Some(row) = tables.states.get_mut(&id) else {
                return Err(StorageError::NotFound(format!("tournament state `{id}`")));
            };
            patch.apply_to(row);
            let row = row.clone();
            store.publish_state(&row);
            Ok(())
        })
    }

    fn list_players(
        &self,
        state_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("list_players")?;
            let tables = store.inner.tables.read().await;
            Ok(tables.roster_of(state_id))
        })
    }

    fn insert_player(&self, entry: PlayerEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("insert_player")?;
            let mut tables = store.inner.tables.write().await;
            let state_id = entry.state_id;
            tables.players.insert(entry.id, entry);
            store.publish_roster(state_id, tables.roster_of(state_id));
            Ok(())
        })
    }

    fn update_player(
        &self,
        entry_id: Uuid,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("update_player")?;
            let mut tables = store.inner.tables.write().await;
            let Some(row) = tables.players.get_mut(&entry_id) else {
                return Ok(());
            };
            patch.apply_to(row);
            let state_id = row.state_id;
            store.publish_roster(state_id, tables.roster_of(state_id));
            Ok(())
        })
    }

    fn delete_player(&self, entry_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("delete_player")?;
            let mut tables = store.inner.tables.write().await;
            if let Some(removed) = tables.players.shift_remove(&entry_id) {
                store.publish_roster(removed.state_id, tables.roster_of(removed.state_id));
            }
            Ok(())
        })
    }

    fn delete_players(&self, state_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available("delete_players")?;
            let mut tables = store.inner.tables.write().await;
            tables.players.retain(|_, entry| entry.state_id != state_id);
            store.publish_roster(state_id, Vec::new());
            Ok(())
        })
    }

    fn subscribe(&self, state_id: Uuid) -> BoxFuture<'static, StorageResult<ChangeFeed>> {
        let receiver = self.inner.changes.subscribe();
        let feed = BroadcastStream::new(receiver)
            .filter_map(move |item| async move {
                match item {
                    Ok((id, change)) if id == state_id => Some(change),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "change feed lagged; next snapshot will heal");
                        None
                    }
                }
            })
            .boxed();
        Box::pin(async move { Ok(feed) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_available("health_check") })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_available("try_reconnect") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{GamePhaseEntity, PlayerStatusEntity};
    use std::time::{Duration, SystemTime};

    fn state_row() -> TournamentStateEntity {
        TournamentStateEntity {
            id: Uuid::new_v4(),
            current_level: 0,
            time_remaining: 720,
            is_paused: true,
            game_phase: GamePhaseEntity::Normal,
            champion_id: None,
            champion_name: None,
            buy_in_amount: 10_000,
            event_id: None,
            tournament_name: None,
            season_name: None,
            event_number: None,
            total_events: None,
            reset_generation: 0,
            updated_at: SystemTime::now(),
        }
    }

    fn player(state_id: Uuid, name: &str, offset: u64) -> PlayerEntryEntity {
        PlayerEntryEntity {
            id: Uuid::new_v4(),
            state_id,
            player_id: name.to_lowercase(),
            name: name.into(),
            status: PlayerStatusEntity::Active,
            position: None,
            has_rebuy: false,
            created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(offset),
        }
    }

    #[tokio::test]
    async fn partial_write_is_broadcast_as_full_row() {
        let store = MemoryTournamentStore::new();
        let row = state_row();
        store.create_state(row.clone()).await.unwrap();
        let mut feed = store.subscribe(row.id).await.unwrap();

        store
            .write_partial(
                row.id,
                StatePatch {
                    is_paused: Some(false),
                    ..StatePatch::default()
                },
            )
            .await
            .unwrap();

        let Some(StoreChange::State(map)) = feed.next().await else {
            panic!("expected a state change");
        };
        assert_eq!(map.get("is_paused"), Some(&Value::Bool(false)));
        assert_eq!(map.get("time_remaining"), Some(&Value::from(720)));
    }

    #[tokio::test]
    async fn roster_changes_carry_the_whole_roster() {
        let store = MemoryTournamentStore::new();
        let row = state_row();
        store.create_state(row.clone()).await.unwrap();
        let mut feed = store.subscribe(row.id).await.unwrap();

        let late = player(row.id, "Bea", 20);
        let early = player(row.id, "Ana", 10);
        store.insert_player(late.clone()).await.unwrap();
        store.insert_player(early).await.unwrap();

        let _ = feed.next().await;
        let Some(StoreChange::Roster(rows)) = feed.next().await else {
            panic!("expected a roster change");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Ana");

        store.delete_players(row.id).await.unwrap();
        let Some(StoreChange::Roster(rows)) = feed.next().await else {
            panic!("expected a roster change");
        };
        assert!(rows.is_empty());
        assert!(store.list_players(row.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_store_rejects_operations() {
        let store = MemoryTournamentStore::new();
        store.set_available(false);
        assert!(store.read_current().await.is_err());
        assert!(store.health_check().await.is_err());
        store.set_available(true);
        assert!(store.read_current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writing_unknown_state_is_not_found() {
        let store = MemoryTournamentStore::new();
        let err = store
            .write_partial(Uuid::new_v4(), StatePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
