#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use futures::{future::BoxFuture, stream::BoxStream};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::dao::models::{PlayerEntryEntity, PlayerPatch, StatePatch, TournamentStateEntity};
use crate::dao::storage::StorageResult;

/// Full-row notification pushed by a backend after a write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// The session row, as loosely typed JSON columns.
    State(Map<String, Value>),
    /// Every roster row of the session, as loosely typed JSON.
    Roster(Vec<Value>),
}

/// Stream of notifications for one session. Dropping it unsubscribes.
pub type ChangeFeed = BoxStream<'static, StoreChange>;

/// Abstraction over the shared store holding the session row and its roster.
pub trait TournamentStore: Send + Sync {
    /// Most recently updated session row, if any exists.
    fn read_current(&self) -> BoxFuture<'static, StorageResult<Option<TournamentStateEntity>>>;
    /// Insert a new session row.
    fn create_state(&self, state: TournamentStateEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Overlay `patch` on the session row `id`.
    fn write_partial(&self, id: Uuid, patch: StatePatch) -> BoxFuture<'static, StorageResult<()>>;
    /// Roster rows of a session in registration order.
    fn list_players(
        &self,
        state_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntryEntity>>>;
    /// Insert a roster row, replacing any row with the same id.
    fn insert_player(&self, entry: PlayerEntryEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Overlay `patch` on a roster row; unknown ids are ignored.
    fn update_player(
        &self,
        entry_id: Uuid,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete one roster row; unknown ids are ignored.
    fn delete_player(&self, entry_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete every roster row of a session.
    fn delete_players(&self, state_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Subscribe to changes of the session and its roster.
    ///
    /// The feed covers every write made after the returned future resolves,
    /// so callers subscribe before their initial full fetch.
    fn subscribe(&self, state_id: Uuid) -> BoxFuture<'static, StorageResult<ChangeFeed>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to restore connectivity after a failed probe.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
