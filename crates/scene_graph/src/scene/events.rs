//! World-matrix change notifications
//!
//! Listeners are registered per [`SceneGraph`](super::SceneGraph) and hear
//! about every actual world-matrix recomputation in that graph.

use super::NodeId;

slotmap::new_key_type! {
    /// Handle returned when registering a listener
    pub struct ListenerId;
}

/// What produced a new world matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOrigin {
    /// Local transform composed with the parent's world matrix
    Local,
    /// Consumed from an external [`TransformSource`](super::TransformSource)
    External,
}

/// A node's world matrix was recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeEvent {
    /// Node that changed
    pub node: NodeId,
    /// Its version after the change
    pub version: u64,
    /// Mechanism that produced the matrix
    pub origin: UpdateOrigin,
}

/// Observer of world-matrix changes
pub trait TransformListener {
    /// Called after each recomputation, ancestors' bounds already invalidated
    fn on_world_matrix_changed(&mut self, event: &NodeEvent);
}

impl<F: FnMut(&NodeEvent)> TransformListener for F {
    fn on_world_matrix_changed(&mut self, event: &NodeEvent) {
        self(event);
    }
}
