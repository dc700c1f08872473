//! partscan - Live part-number scan-match engine
//!
//! Consumes per-frame streams of recognized-text fragments from an external
//! recognizer, merges spatially adjacent fragments into part-number
//! candidates, deduplicates and schedules asynchronous catalog lookups, and
//! freezes on a decisive exact match until explicitly restarted.
//!
//! Camera capture, the recognition model, the catalog service, and all UI
//! live outside this crate; the engine touches them only through the
//! per-frame entry point, the [`catalog::CatalogSearch`] trait, and the
//! event channel.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod events;
pub mod frame;
pub mod geometry;
pub mod pipeline;

pub use catalog::{CatalogItem, CatalogSearch, LookupError};
pub use config::EngineConfig;
pub use engine::{EngineMode, FrameSummary, MatchResult, ScanEngine};
pub use events::{EngineEvent, ResolveOutcome, ScanProgress};
pub use frame::{Candidate, TextFragment};
pub use geometry::Rect;
