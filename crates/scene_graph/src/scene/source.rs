//! External transform source consumed by linked nodes
//!
//! A physics body or animation rig that owns a node's world transform.

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::math::Mat4;

/// Provider of a world transform computed outside the hierarchy
pub trait TransformSource {
    /// True when a new transform is waiting to be consumed
    fn is_dirty(&self) -> bool;

    /// Current world transform
    fn world_transform(&self) -> Mat4;

    /// Called once after a dirty transform has been consumed
    fn acknowledge(&mut self);
}

/// Shared handle to an injected transform source
pub type SourceRef = Rc<RefCell<dyn TransformSource>>;
