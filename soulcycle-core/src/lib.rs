//! # Soul-Cycle Core Library
//!
//! Persistent meta-progression for a run-based action game. A single player
//! profile survives across runs and game versions:
//!
//! - **Profile** ([`profile`]): the versioned, typed record
//! - **Migration** ([`migration`]): forward-only schema chain, total on garbage
//! - **Persistence** ([`persistence`]): primary and backup slots in a key-value store
//! - **Mastery** ([`mastery`]): run XP, level curves, exact XP distribution
//! - **Trees** ([`tree`]): attribute unlock trees and their exclusive groups
//!
//! ## Robustness Contract
//!
//! - Loading a profile never fails; bad data degrades to defaults.
//! - Migration never mutates its caller's input.
//! - XP split across attributes sums exactly to the amount granted.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod content;
pub mod error;
pub mod flags;
pub mod mastery;
pub mod migration;
pub mod persistence;
pub mod profile;
pub mod sanitize;
pub mod tree;
pub mod types;

pub use config::{MasteryConfig, PersistenceConfig, SoulCycleConfig};
pub use content::Content;
pub use error::ProfileError;
pub use flags::{FeatureFlags, FlagReader};
pub use mastery::{MasteryGain, RunResult, RunSnapshot};
pub use persistence::{MemoryStorage, ProfileStorage, ProfileStore, SaveOptions, SqliteStorage};
pub use profile::{CURRENT_SCHEMA_VERSION, Profile};
pub use types::*;
