#![forbid(unsafe_code)]

//! Core domain model and business logic for the Stride training engine.
//!
//! This crate provides:
//! - Domain types (activities, metrics, profiles, plans, suggestions)
//! - Dual-channel load normalization
//! - Rolling metrics engine (CTL/ATL/TSB/ACWR/readiness)
//! - Plan toolkit (phases, volume curves, workouts, guardrails)
//! - Adaptation engine (triggers, suggestion lifecycle)
//! - Persistence (WAL, CSV archive, athlete state)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod load;
pub mod vdot;
pub mod metrics;
pub mod phases;
pub mod volume;
pub mod workout;
pub mod guardrails;
pub mod adaptation;
pub mod wal;
pub mod history;
pub mod csv_rollup;
pub mod state;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use adaptation::{apply_suggestion, evaluate_triggers, SuggestionStore, TriggerInputs};
pub use guardrails::{validate_plan, validate_week};
pub use history::{load_all_activities, load_recent_activities};
pub use load::normalize;
pub use metrics::{daily_loads, recompute};
pub use phases::allocate_phases;
pub use state::AthleteState;
pub use volume::{progress_volume, suggest_volume};
pub use wal::{ActivitySink, JsonlSink};
pub use workout::{build_plan, construct_workout, PlanRequest};
