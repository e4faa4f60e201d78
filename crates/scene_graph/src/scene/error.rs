//! Scene graph errors
//!
//! Every variant is a local contract violation reported to the caller. The
//! graph is never mutated before one of these is returned.

use thiserror::Error;

use super::NodeId;

/// Errors raised by scene graph operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Handle does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Child already has a parent and must be detached first
    #[error("Node {child:?} already has parent {parent:?}")]
    AlreadyParented {
        /// Node being attached
        child: NodeId,
        /// Its current parent
        parent: NodeId,
    },

    /// Detach target is not a child of the given parent
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Node being detached
        child: NodeId,
        /// Node it was claimed to belong to
        parent: NodeId,
    },

    /// Attaching would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Node being attached
        child: NodeId,
        /// Requested parent, which is the child or one of its descendants
        parent: NodeId,
    },

    /// Raw enum code outside the valid range
    #[error("Invalid {kind} value: {value}")]
    InvalidEnum {
        /// Which enum was being decoded
        kind: &'static str,
        /// Offending raw value
        value: u8,
    },

    /// Operation requires a different node variant
    #[error("Node {node:?} is not a {expected} node")]
    WrongNodeKind {
        /// Node the operation was applied to
        node: NodeId,
        /// Variant the operation needs
        expected: &'static str,
    },
}

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;
