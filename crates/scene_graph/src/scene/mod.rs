//! Scene graph: transform hierarchy, bounds aggregation and culling
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (arena, owns nodes)
//!      ↓
//! Node { Plain | Culling | Linked }
//!      ↓
//! Renderable entities (attached, not owned)
//! ```
//!
//! Culling granularity is decided by where culling nodes sit in the tree.
//! One culling node over thousands of small leaves yields one large box
//! that is almost never disjoint from the view.

mod bounds;
mod error;
mod events;
mod frustum;
mod graph;
mod node;
mod renderable;
mod source;

#[cfg(test)]
mod tests;

pub use bounds::AABB;
pub use error::{SceneError, SceneResult};
pub use events::{ListenerId, NodeEvent, TransformListener, UpdateOrigin};
pub use frustum::{Containment, Frustum, Plane};
pub use graph::{DrawStats, SceneGraph};
pub use node::{CullingState, LinkedState, Node, NodeId, NodeKind};
pub use renderable::{EntityRef, Renderable};
pub use source::{SourceRef, TransformSource};
