//! Track matching library - shared modules for all binaries.

pub mod compare;
pub mod library;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod services;
pub mod settings;

pub use library::LibraryIndex;
pub use matcher::{find_best_match, find_matches, find_matches_with_stage, resolve};
pub use models::{LookupRequest, MatchOutcome, MatchStage, ResolveStats, ResolvedTrack, Track};
pub use services::ServiceRegistry;
pub use settings::LookupSettings;
