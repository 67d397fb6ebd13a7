//! Error types for the session layer.

use soulcycle_core::ProfileError;
use soulcycle_core::types::AttributeId;
use thiserror::Error;

/// Errors surfaced to the game by a [`crate::Session`].
#[derive(Error, Debug)]
pub enum SessionError {
    /// Saving or opening the profile failed.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Meta mastery is switched off by a feature flag.
    #[error("Meta mastery is disabled")]
    MasteryDisabled,

    /// No such node in the attribute's tree.
    #[error("Unknown {attribute} tree node: {node_id}")]
    UnknownNode {
        /// Tree the node was looked up in.
        attribute: AttributeId,
        /// Requested node.
        node_id: String,
    },

    /// The node is already unlocked.
    #[error("Tree node already unlocked: {0}")]
    AlreadyUnlocked(String),

    /// The attribute has no unspent points.
    #[error("No {0} mastery points available")]
    NoPointsAvailable(AttributeId),

    /// Another member of the node's exclusive group is already chosen.
    #[error("Exclusive group {group} already has {selected}")]
    ExclusiveGroupTaken {
        /// Exclusive group id.
        group: String,
        /// Currently selected member.
        selected: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SessionError>;
