//! # soulcycle-session - Session Integration for Soul-Cycle Progression
//!
//! This crate sits between the game's run states and the game-agnostic
//! `soulcycle-core` library. It owns the single active profile for a play
//! session and threads it through load, gameplay, run end and save.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │      Run states / armory / menus         │
//! │  ┌────────────────────────────────────┐  │
//! │  │        soulcycle-session           │  │
//! │  │  ┌────────────┐  ┌──────────────┐  │  │
//! │  │  │   Hooks    │─▶│   Session    │  │  │
//! │  │  └────────────┘  └──────┬───────┘  │  │
//! │  │                         ▼          │  │
//! │  │    ┌──────────────────────────┐    │  │
//! │  │    │      soulcycle-core      │    │  │
//! │  │    └──────────────────────────┘    │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `events`: progression events emitted by the game
//! - `hooks`: one-line constructors for those events
//! - `session`: the active profile and its store
//! - `logging`: tracing subscriber bootstrap

pub mod error;
pub mod events;
pub mod hooks;
pub mod logging;
pub mod session;

pub use error::SessionError;
pub use events::{EventOutcome, ProgressionEvent};
pub use logging::init_logging;
pub use session::Session;
