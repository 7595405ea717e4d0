//! Client-side match and scoring orchestration for Shape Hunter.
/// Application directory helpers.
pub mod app_dirs;
/// Backend collaborators and their HTTP implementation.
pub mod backend;
/// Persisted settings.
pub mod config;
/// Shared HTTP agent helpers.
pub(crate) mod http_client;
/// Image validation and staging.
pub mod intake;
/// Logging setup.
pub mod logging;
/// The round state machine.
pub mod orchestrator;
/// Confidence aggregation and battle resolution.
pub mod scoring;
/// Read-only player identity.
pub mod session;
/// Shape catalog and daily rotation.
pub mod shapes;
