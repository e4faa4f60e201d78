//! Scene node record and the per-node caching protocol
//!
//! A node caches its local and world matrices. The local matrix is rebuilt
//! only while the node is dirty; the world matrix is rebuilt when the node
//! is dirty or its parent's version moved since the last rebuild. Each
//! rebuild bumps `version` exactly once, which is what children compare
//! against on their own next refresh.

use crate::foundation::math::{compose_trs, decompose_trs, Mat4, Transform};

use super::events::UpdateOrigin;
use super::{EntityRef, SourceRef, AABB};

slotmap::new_key_type! {
    /// Stable handle to a node stored in a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

/// Parent version observed at the last world-matrix rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParentStamp {
    /// Rebuilt as a root
    Orphan,
    /// Rebuilt under a parent at this version
    Seen(u64),
    /// Reparented since the last rebuild
    Stale,
}

/// Parent state a child needs to refresh itself
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParentSnapshot {
    pub version: u64,
    pub world: Mat4,
}

impl ParentSnapshot {
    pub fn of(node: &Node) -> Self {
        Self {
            version: node.version,
            world: node.world_matrix,
        }
    }
}

/// Extra state for nodes that cull their subtree
#[derive(Debug, Clone)]
pub struct CullingState {
    pub(crate) cached_bounds: AABB,
    pub(crate) bounds_dirty: bool,
}

impl Default for CullingState {
    fn default() -> Self {
        Self {
            cached_bounds: AABB::empty(),
            bounds_dirty: true,
        }
    }
}

/// Extra state for nodes driven by an external transform source
#[derive(Clone, Default)]
pub struct LinkedState {
    pub(crate) source: Option<SourceRef>,
    pub(crate) preserve_local_scale: bool,
}

impl std::fmt::Debug for LinkedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedState")
            .field("bound", &self.source.is_some())
            .field("preserve_local_scale", &self.preserve_local_scale)
            .finish()
    }
}

/// Behavior variant of a node
#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    /// Ordinary transform node
    #[default]
    Plain,
    /// Caches subtree bounds and skips drawing when outside the frustum
    Culling(CullingState),
    /// Takes its world matrix from an external source when one is bound
    Linked(LinkedState),
}

impl NodeKind {
    /// Culling variant with empty, dirty bounds
    pub fn culling() -> Self {
        Self::Culling(CullingState::default())
    }

    /// Linked variant with no source bound yet
    pub fn linked(preserve_local_scale: bool) -> Self {
        Self::Linked(LinkedState {
            source: None,
            preserve_local_scale,
        })
    }

    /// Short name used in logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Culling(_) => "culling",
            Self::Linked(_) => "linked",
        }
    }
}

/// A node in the transform hierarchy
pub struct Node {
    pub(crate) name: Option<String>,
    pub(crate) transform: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) entities: Vec<EntityRef>,
    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,
    pub(crate) dirty: bool,
    pub(crate) version: u64,
    pub(crate) parent_stamp: ParentStamp,
    pub(crate) visible: bool,
    pub(crate) kind: NodeKind,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .field("entities", &self.entities.len())
            .field("dirty", &self.dirty)
            .field("version", &self.version)
            .field("visible", &self.visible)
            .finish()
    }
}

impl Node {
    /// Detached, dirty, version 0
    pub(crate) fn new(kind: NodeKind, transform: Transform) -> Self {
        Self {
            name: None,
            transform,
            parent: None,
            children: Vec::new(),
            entities: Vec::new(),
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            dirty: true,
            version: 0,
            parent_stamp: ParentStamp::Orphan,
            visible: true,
            kind,
        }
    }

    /// Debug name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Local transform fields
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Parent handle
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Owned children in traversal order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Attached entities in draw order
    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    /// Whether the cached matrices are stale. Does not trigger a refresh.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of world-matrix rebuilds so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Visibility flag consulted by draw traversal
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Behavior variant
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Cached local matrix without refreshing
    pub fn cached_local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    /// Cached world matrix without refreshing
    pub fn cached_world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// For culling nodes, whether the cached bounds are stale
    pub fn bounds_dirty(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Culling(culling) => Some(culling.bounds_dirty),
            _ => None,
        }
    }

    /// For culling nodes, the last aggregated bounds
    pub fn cached_bounds(&self) -> Option<AABB> {
        match &self.kind {
            NodeKind::Culling(culling) => Some(culling.cached_bounds),
            _ => None,
        }
    }

    pub(crate) fn is_culling(&self) -> bool {
        matches!(self.kind, NodeKind::Culling(_))
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.label())
    }

    /// Bring this node's matrices up to date, assuming `parent` is current.
    ///
    /// Returns the origin of the new world matrix if one was built.
    pub(crate) fn refresh(&mut self, parent: Option<&ParentSnapshot>) -> Option<UpdateOrigin> {
        if let NodeKind::Linked(linked) = &self.kind {
            if let Some(source) = linked.source.clone() {
                let preserve_local_scale = linked.preserve_local_scale;
                return self.refresh_linked(&source, preserve_local_scale, parent);
            }
        }
        self.refresh_local(parent)
    }

    fn parent_changed(&self, parent: Option<&ParentSnapshot>) -> bool {
        match (parent, self.parent_stamp) {
            (Some(parent), ParentStamp::Seen(seen)) => parent.version != seen,
            (None, ParentStamp::Orphan) => false,
            _ => true,
        }
    }

    fn stamp_for(parent: Option<&ParentSnapshot>) -> ParentStamp {
        parent.map_or(ParentStamp::Orphan, |parent| ParentStamp::Seen(parent.version))
    }

    fn refresh_local(&mut self, parent: Option<&ParentSnapshot>) -> Option<UpdateOrigin> {
        if self.dirty {
            self.local_matrix = self.transform.to_matrix();
        }
        if !self.dirty && !self.parent_changed(parent) {
            return None;
        }

        self.world_matrix = match parent {
            Some(parent) => parent.world * self.local_matrix,
            None => self.local_matrix,
        };
        self.parent_stamp = Self::stamp_for(parent);
        self.version += 1;
        self.dirty = false;
        Some(UpdateOrigin::Local)
    }

    fn refresh_linked(
        &mut self,
        source: &SourceRef,
        preserve_local_scale: bool,
        parent: Option<&ParentSnapshot>,
    ) -> Option<UpdateOrigin> {
        let source_dirty = source.borrow().is_dirty();
        if self.dirty {
            self.local_matrix = self.transform.to_matrix();
        }
        let scale_moved = preserve_local_scale && self.parent_changed(parent);
        if !source_dirty && !self.dirty && !scale_moved {
            return None;
        }

        let external = source.borrow().world_transform();
        self.world_matrix = if preserve_local_scale {
            let accumulated = parent
                .map_or(self.local_matrix, |parent| parent.world * self.local_matrix);
            let (_, _, scale) = decompose_trs(&accumulated);
            let (position, rotation, _) = decompose_trs(&external);
            compose_trs(position, rotation, scale)
        } else {
            external
        };

        if source_dirty {
            source.borrow_mut().acknowledge();
        }
        self.parent_stamp = Self::stamp_for(parent);
        self.version += 1;
        self.dirty = false;
        Some(UpdateOrigin::External)
    }
}
