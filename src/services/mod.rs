/// 1 Hz countdown loop.
pub mod clock_service;
/// Operator commands with optimistic local updates.
pub mod command_service;
/// Display and operator snapshot rendering.
pub mod display_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Roster import from the registry matcher.
pub mod import_service;
/// Public read-only projection.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervision with backoff and degraded mode.
pub mod storage_supervisor;
/// Session load and change feed reconciliation.
pub mod sync_service;
/// Undo buffer timers.
pub mod undo_service;
