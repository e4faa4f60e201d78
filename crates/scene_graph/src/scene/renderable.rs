//! Renderable entity collaborator
//!
//! Entities are attached to nodes but never owned by them; the scene graph
//! only hands them matrices. Drawing itself happens outside this crate.

use std::rc::Rc;

use crate::foundation::math::Mat4;

use super::{NodeId, AABB};

/// Something a node can draw and measure
pub trait Renderable {
    /// Render with the owning node's matrices
    fn draw(&self, node: NodeId, local: &Mat4, world: &Mat4);

    /// World-space bounds given the owning node's matrices
    fn bounding_box(&self, node: NodeId, local: &Mat4, world: &Mat4) -> AABB;

    /// Invisible entities are neither drawn nor included in node bounds
    fn is_visible(&self) -> bool {
        true
    }
}

/// Shared, non-owning handle to an attached entity
pub type EntityRef = Rc<dyn Renderable>;
