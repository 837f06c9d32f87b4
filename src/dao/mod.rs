/// Persisted row definitions and partial updates.
pub mod models;
/// Storage error shared by every backend.
pub mod storage;
/// Shared store holding the session row, its roster and a change feed.
pub mod tournament_store;
