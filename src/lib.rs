// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod announcement;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod metrics;
pub mod orchestrator;
pub mod parser;
pub mod publish;
pub mod refresh;
pub mod selection;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::announcement::{Announcement, Source, StatusRecord};
pub use crate::config::{AppConfig, TrackerConfig};
pub use crate::error::TrackerError;
pub use crate::manager::{AnnouncementManager, SharedManager};
pub use crate::orchestrator::{PostOutcome, PostingOrchestrator};
