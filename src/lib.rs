//! ironlayer-core: the deterministic, cost-aware planning and governance
//! core for SQL transformation pipelines.
//!
//! Four subsystems compose the public surface: SQL canonicalisation and
//! hashing (`sql`), a deterministic planner over model definitions and
//! their dependency graph (`models`, `dag`, `planner`, `checks`), a
//! governance core (`governance`), and an advisory intelligence engine
//! (`advisory`). `telemetry`, `events`, and `store` make up the ambient
//! stack every other module reports into or reads from.

pub mod advisory;
pub mod checks;
pub mod config;
pub mod dag;
pub mod error;
pub mod events;
pub mod governance;
pub mod models;
pub mod planner;
pub mod sql;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use error::{IronlayerError, Result};
