//! # Scene Graph
//!
//! A transform hierarchy with lazy world-matrix caching and frustum culling.
//!
//! ## Features
//!
//! - **Incremental Transforms**: world matrices rebuilt only when a node or
//!   one of its ancestors changed, detected through per-node version counters
//! - **Bounds Aggregation**: culling nodes cache the union of their subtree
//! - **Frustum Culling**: disjoint subtrees are skipped but kept current
//! - **External Sources**: linked nodes take their world matrix from a
//!   physics body or animation rig
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_graph::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut graph = SceneGraph::new();
//!     let root = graph.create_plain();
//!     let arm = graph.create_plain();
//!     graph.attach(root, arm)?;
//!
//!     graph.set_position(root, Vec3::new(10.0, 0.0, 0.0))?;
//!     graph.set_position(arm, Vec3::new(0.0, 10.0, 0.0))?;
//!
//!     let world = graph.world_matrix(arm)?;
//!     assert_eq!(world.m14, 10.0);
//!     assert_eq!(world.m24, 10.0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod scene;

/// Common imports for scene graph users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, SceneConfig},
        foundation::math::{AxisOrder, CompositionOrder, Mat4, Quat, Rotation, Transform, Vec3},
        scene::{
            Containment, DrawStats, EntityRef, Frustum, NodeEvent, NodeId, NodeKind, Renderable,
            SceneError, SceneGraph, SceneResult, SourceRef, TransformListener, TransformSource,
            UpdateOrigin, AABB,
        },
    };
}
