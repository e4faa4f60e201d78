//! Scene graph arena
//!
//! Owns every node of one or more trees. Nodes are addressed by [`NodeId`]
//! handles; parent links are back-references only and ownership flows from
//! the arena. All matrix reads are pull-based: reading a node's matrices
//! first refreshes its ancestor chain top-down, then the node itself.
//!
//! Culling nodes cache the union of their subtree's bounds. Any event that
//! can move that union (a transform edit, a rebuilt world matrix, entity or
//! child changes) marks the cache dirty on the node and every culling
//! ancestor. A dirty culling node always has dirty culling ancestors, so the
//! upward walk stops at the first one already dirty.

use slotmap::SlotMap;

use crate::config::SceneConfig;
use crate::foundation::math::{AxisOrder, CompositionOrder, Mat4, Rotation, Transform, Vec3};

use super::events::{ListenerId, NodeEvent, TransformListener};
use super::node::{Node, NodeKind, ParentSnapshot, ParentStamp};
use super::{Containment, EntityRef, Frustum, NodeId, SceneError, SceneResult, SourceRef, AABB};

/// Counters collected during a draw traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Visible nodes reached by the traversal
    pub nodes_visited: usize,
    /// Culling nodes whose subtree was skipped
    pub nodes_culled: usize,
    /// Entity draw calls issued
    pub entities_drawn: usize,
    /// World matrices refreshed while measuring subtrees that were then culled.
    ///
    /// These nodes are kept current without being drawn. Zero when nothing
    /// under a culled node changed since its bounds were last computed.
    pub forced_updates: usize,
}

impl std::ops::AddAssign for DrawStats {
    fn add_assign(&mut self, other: Self) {
        self.nodes_visited += other.nodes_visited;
        self.nodes_culled += other.nodes_culled;
        self.entities_drawn += other.entities_drawn;
        self.forced_updates += other.forced_updates;
    }
}

/// Arena of scene nodes plus the listeners observing them
pub struct SceneGraph {
    config: SceneConfig,
    nodes: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
    bound_sources: Vec<NodeId>,
    listeners: SlotMap<ListenerId, Box<dyn TransformListener>>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create an empty graph with default configuration
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create an empty graph with custom configuration
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(config.initial_capacity),
            roots: Vec::new(),
            bound_sources: Vec::new(),
            listeners: SlotMap::with_key(),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Replace the configuration. Existing nodes keep their orders.
    pub fn set_config(&mut self, config: SceneConfig) {
        self.config = config;
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Parentless nodes in the order they became roots
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Read-only view of a node's cached state
    pub fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    // ------------------------------------------------------------------
    // Creation and structure
    // ------------------------------------------------------------------

    /// Create a detached node of the given kind
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let transform = Transform::with_orders(
            self.config.default_axis_order,
            self.config.default_composition_order,
        );
        let id = self.nodes.insert(Node::new(kind, transform));
        self.roots.push(id);
        log::trace!("Created {} node {:?}", self.nodes[id].kind.label(), id);
        id
    }

    /// Create a detached node with a debug name
    pub fn create_named(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = self.create_node(kind);
        self.nodes[id].name = Some(name.into());
        id
    }

    /// Create a detached plain node
    pub fn create_plain(&mut self) -> NodeId {
        self.create_node(NodeKind::Plain)
    }

    /// Create a detached culling node
    pub fn create_culling(&mut self) -> NodeId {
        self.create_node(NodeKind::culling())
    }

    /// Create a detached linked node with no source bound
    pub fn create_linked(&mut self, preserve_local_scale: bool) -> NodeId {
        self.create_node(NodeKind::linked(preserve_local_scale))
    }

    /// True if `ancestor` is `node` or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent);
        }
        false
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        if let Some(current) = self.node(child)?.parent {
            log::warn!("Rejected attach of {:?}: already parented to {:?}", child, current);
            return Err(SceneError::AlreadyParented { child, parent: current });
        }
        if self.is_ancestor_or_self(child, parent) {
            log::warn!("Rejected attach of {:?} under its own descendant {:?}", child, parent);
            return Err(SceneError::CycleDetected { child, parent });
        }
        Ok(())
    }

    /// Make `child` the last child of `parent`
    ///
    /// Fails if `child` already has a parent or if `parent` is `child` or
    /// one of its descendants. The child's world matrix is rebuilt on its
    /// next read.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.check_attach(parent, child)?;

        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.parent_stamp = ParentStamp::Stale;
        self.nodes[parent].children.push(child);
        self.roots.retain(|&root| root != child);
        self.invalidate_bounds_from(parent);

        log::debug!(
            "Attached '{}' under '{}'",
            self.nodes[child].label(),
            self.nodes[parent].label()
        );
        Ok(())
    }

    /// Remove `child` from `parent`, leaving it as a root
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            log::warn!("Rejected detach of {:?}: not a child of {:?}", child, parent);
            return Err(SceneError::NotAChild { child, parent });
        }

        self.nodes[parent].children.retain(|&c| c != child);
        let node = &mut self.nodes[child];
        node.parent = None;
        node.parent_stamp = ParentStamp::Stale;
        self.roots.push(child);
        self.invalidate_bounds_from(parent);

        log::debug!(
            "Detached '{}' from '{}'",
            self.nodes[child].label(),
            self.nodes[parent].label()
        );
        Ok(())
    }

    /// Move `child` under `new_parent`, detaching it from any current parent
    ///
    /// Validated up front: on error the tree is unchanged.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> SceneResult<()> {
        self.node(new_parent)?;
        let current = self.node(child)?.parent;
        if self.is_ancestor_or_self(child, new_parent) {
            log::warn!(
                "Rejected reparent of {:?} under its own descendant {:?}",
                child,
                new_parent
            );
            return Err(SceneError::CycleDetected { child, parent: new_parent });
        }
        if current == Some(new_parent) {
            return Ok(());
        }

        if let Some(current) = current {
            self.detach(current, child)?;
        }
        self.attach(new_parent, child)
    }

    /// Destroy `id` and its whole subtree, returning how many nodes were freed
    pub fn remove_node(&mut self, id: NodeId) -> SceneResult<usize> {
        if let Some(parent) = self.node(id)?.parent {
            self.detach(parent, id)?;
        }
        self.roots.retain(|&root| root != id);

        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        let nodes = &self.nodes;
        self.bound_sources.retain(|&bound| nodes.contains_key(bound));

        log::debug!("Removed {} node(s) rooted at {:?}", removed, id);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Transform edits
    // ------------------------------------------------------------------

    /// Local transform fields
    pub fn transform(&self, id: NodeId) -> SceneResult<&Transform> {
        Ok(&self.node(id)?.transform)
    }

    /// Mutable access to the local transform; marks the node dirty
    pub fn transform_mut(&mut self, id: NodeId) -> SceneResult<&mut Transform> {
        self.mark_dirty(id)?;
        Ok(&mut self.nodes[id].transform)
    }

    /// Flag the node's matrices as stale without changing its transform
    pub fn mark_dirty(&mut self, id: NodeId) -> SceneResult<()> {
        self.node_mut(id)?.dirty = true;
        self.invalidate_bounds_from(id);
        Ok(())
    }

    /// Replace the whole local transform
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> SceneResult<()> {
        *self.transform_mut(id)? = transform;
        Ok(())
    }

    /// Set the local position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        self.transform_mut(id)?.position = position;
        Ok(())
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, id: NodeId, rotation: Rotation) -> SceneResult<()> {
        self.transform_mut(id)?.rotation = rotation;
        Ok(())
    }

    /// Set the local scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> SceneResult<()> {
        self.transform_mut(id)?.scale = scale;
        Ok(())
    }

    /// Set how Euler angles are combined
    pub fn set_axis_order(&mut self, id: NodeId, order: AxisOrder) -> SceneResult<()> {
        self.transform_mut(id)?.axis_order = order;
        Ok(())
    }

    /// Set how translation, rotation and scale are combined
    pub fn set_composition_order(
        &mut self,
        id: NodeId,
        order: CompositionOrder,
    ) -> SceneResult<()> {
        self.transform_mut(id)?.composition_order = order;
        Ok(())
    }

    /// Show or hide a node (and, for drawing, its subtree)
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> SceneResult<()> {
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entities and external sources
    // ------------------------------------------------------------------

    /// Attach a renderable entity to a node
    pub fn attach_entity(&mut self, id: NodeId, entity: EntityRef) -> SceneResult<()> {
        self.node_mut(id)?.entities.push(entity);
        self.invalidate_bounds_from(id);
        Ok(())
    }

    /// Detach an entity by identity; returns whether it was attached
    pub fn detach_entity(&mut self, id: NodeId, entity: &EntityRef) -> SceneResult<bool> {
        let node = self.node_mut(id)?;
        let before = node.entities.len();
        node.entities.retain(|attached| !std::rc::Rc::ptr_eq(attached, entity));
        let removed = node.entities.len() != before;
        if removed {
            self.invalidate_bounds_from(id);
        }
        Ok(removed)
    }

    /// Bind an external transform source to a linked node
    pub fn bind_source(&mut self, id: NodeId, source: SourceRef) -> SceneResult<()> {
        self.linked_state(id)?.source = Some(source);
        if !self.bound_sources.contains(&id) {
            self.bound_sources.push(id);
        }
        self.mark_dirty(id)?;
        log::debug!("Bound transform source to '{}'", self.nodes[id].label());
        Ok(())
    }

    /// Unbind the source, returning to local transform composition
    pub fn unbind_source(&mut self, id: NodeId) -> SceneResult<Option<SourceRef>> {
        let previous = self.linked_state(id)?.source.take();
        self.bound_sources.retain(|&bound| bound != id);
        self.mark_dirty(id)?;
        log::debug!("Unbound transform source from '{}'", self.nodes[id].label());
        Ok(previous)
    }

    /// Choose whether a linked node keeps its authored scale
    pub fn set_preserve_local_scale(&mut self, id: NodeId, preserve: bool) -> SceneResult<()> {
        self.linked_state(id)?.preserve_local_scale = preserve;
        self.mark_dirty(id)
    }

    fn linked_state(&mut self, id: NodeId) -> SceneResult<&mut super::node::LinkedState> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Linked(linked) => Ok(linked),
            _ => Err(SceneError::WrongNodeKind { node: id, expected: "linked" }),
        }
    }

    /// Pull pending external transforms into their linked nodes.
    ///
    /// Run before culling so cached bounds observe source changes that
    /// happened outside the graph. Returns the number of nodes rebuilt.
    pub fn sync_external_sources(&mut self) -> SceneResult<usize> {
        let nodes = &self.nodes;
        let pending: Vec<NodeId> = self
            .bound_sources
            .iter()
            .copied()
            .filter(|&id| match &nodes[id].kind {
                NodeKind::Linked(linked) => linked
                    .source
                    .as_ref()
                    .is_some_and(|source| source.borrow().is_dirty()),
                _ => false,
            })
            .collect();

        let mut rebuilt = 0;
        for id in pending {
            if self.ensure_updated(id)? {
                rebuilt += 1;
            }
        }
        Ok(rebuilt)
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Register an observer of world-matrix changes
    pub fn add_listener(&mut self, listener: impl TransformListener + 'static) -> ListenerId {
        self.listeners.insert(Box::new(listener))
    }

    /// Unregister an observer; returns whether it was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    fn notify(&mut self, event: &NodeEvent) {
        for listener in self.listeners.values_mut() {
            listener.on_world_matrix_changed(event);
        }
    }

    // ------------------------------------------------------------------
    // Caching protocol
    // ------------------------------------------------------------------

    /// Refresh `id` and its ancestors; returns whether `id` itself rebuilt.
    ///
    /// Idempotent: a second call with no intervening edit rebuilds nothing.
    pub fn ensure_updated(&mut self, id: NodeId) -> SceneResult<bool> {
        self.node(id)?;

        let mut chain = vec![id];
        while let Some(parent) = chain.last().and_then(|&last| self.nodes[last].parent) {
            chain.push(parent);
        }

        let mut rebuilt = false;
        for &node in chain.iter().rev() {
            rebuilt = self.update_node(node);
        }
        Ok(rebuilt)
    }

    /// Refresh a single node whose parent is already current
    fn update_node(&mut self, id: NodeId) -> bool {
        let parent = self.nodes[id]
            .parent
            .map(|parent| ParentSnapshot::of(&self.nodes[parent]));
        let Some(origin) = self.nodes[id].refresh(parent.as_ref()) else {
            return false;
        };

        let version = self.nodes[id].version;
        log::trace!(
            "'{}' rebuilt world matrix (v{}, {:?})",
            self.nodes[id].label(),
            version,
            origin
        );
        self.invalidate_bounds_from(id);
        self.notify(&NodeEvent { node: id, version, origin });
        true
    }

    /// Current world matrix, refreshing as needed
    pub fn world_matrix(&mut self, id: NodeId) -> SceneResult<Mat4> {
        self.ensure_updated(id)?;
        Ok(self.nodes[id].world_matrix)
    }

    /// Current local matrix, refreshing as needed
    pub fn local_matrix(&mut self, id: NodeId) -> SceneResult<Mat4> {
        self.ensure_updated(id)?;
        Ok(self.nodes[id].local_matrix)
    }

    /// Version counter; does not refresh
    pub fn version(&self, id: NodeId) -> SceneResult<u64> {
        Ok(self.node(id)?.version)
    }

    /// Refresh `id` and every descendant regardless of visibility.
    ///
    /// Returns how many world matrices were rebuilt.
    pub fn force_update(&mut self, id: NodeId) -> SceneResult<usize> {
        let mut rebuilt = usize::from(self.ensure_updated(id)?);
        rebuilt += self.update_descendants(id);
        Ok(rebuilt)
    }

    /// Refresh every node in the graph
    pub fn update_all(&mut self) -> SceneResult<usize> {
        let roots = self.roots.clone();
        let mut rebuilt = 0;
        for root in roots {
            rebuilt += self.force_update(root)?;
        }
        Ok(rebuilt)
    }

    fn update_descendants(&mut self, id: NodeId) -> usize {
        let mut rebuilt = 0;
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            rebuilt += usize::from(self.update_node(current));
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        rebuilt
    }

    // ------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------

    fn invalidate_bounds_from(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &mut self.nodes[current];
            if let NodeKind::Culling(culling) = &mut node.kind {
                if culling.bounds_dirty {
                    break;
                }
                culling.bounds_dirty = true;
            }
            cursor = node.parent;
        }
    }

    /// Mark bounds stale after an entity's geometry or visibility changed
    pub fn invalidate_bounds(&mut self, id: NodeId) -> SceneResult<()> {
        self.node(id)?;
        self.invalidate_bounds_from(id);
        Ok(())
    }

    /// World-space bounds of the node's visible entities and all descendants.
    ///
    /// A node with nothing to bound yields [`AABB::empty`].
    pub fn bounding_box(&mut self, id: NodeId) -> SceneResult<AABB> {
        self.node(id)?;
        self.sync_external_sources()?;
        self.ensure_updated(id)?;
        Ok(self.subtree_bounds(id, &mut 0))
    }

    /// Bounds of a node that is already current.
    ///
    /// Descendants are refreshed on the way down; `rebuilt` counts the ones
    /// whose world matrix changed.
    fn subtree_bounds(&mut self, id: NodeId, rebuilt: &mut usize) -> AABB {
        if let NodeKind::Culling(culling) = &self.nodes[id].kind {
            if !culling.bounds_dirty {
                return culling.cached_bounds;
            }
        }

        let node = &self.nodes[id];
        let mut bounds = node
            .entities
            .iter()
            .filter(|entity| entity.is_visible())
            .fold(AABB::empty(), |acc, entity| {
                acc.union(&entity.bounding_box(id, &node.local_matrix, &node.world_matrix))
            });

        for index in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[index];
            *rebuilt += usize::from(self.update_node(child));
            bounds = bounds.union(&self.subtree_bounds(child, rebuilt));
        }

        if let NodeKind::Culling(culling) = &mut self.nodes[id].kind {
            culling.cached_bounds = bounds;
            culling.bounds_dirty = false;
        }
        bounds
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Draw the subtree rooted at `id`
    ///
    /// Culling nodes test their bounds against `frustum` when one is given
    /// and culling is enabled; a disjoint subtree issues no entity draws but
    /// its matrices are still brought up to date.
    pub fn draw(&mut self, id: NodeId, frustum: Option<&Frustum>) -> SceneResult<DrawStats> {
        let frustum = self.active_frustum(frustum)?;
        self.draw_root(id, frustum)
    }

    /// Draw every root in order, pulling external sources once
    pub fn draw_all(&mut self, frustum: Option<&Frustum>) -> SceneResult<DrawStats> {
        let frustum = self.active_frustum(frustum)?;
        let roots = self.roots.clone();
        let mut stats = DrawStats::default();
        for root in roots {
            stats += self.draw_root(root, frustum)?;
        }
        Ok(stats)
    }

    /// Frustum to cull against, after syncing sources if culling is on
    fn active_frustum<'f>(
        &mut self,
        frustum: Option<&'f Frustum>,
    ) -> SceneResult<Option<&'f Frustum>> {
        let frustum = frustum.filter(|_| self.config.culling_enabled);
        if frustum.is_some() {
            self.sync_external_sources()?;
        }
        Ok(frustum)
    }

    fn draw_root(&mut self, id: NodeId, frustum: Option<&Frustum>) -> SceneResult<DrawStats> {
        let mut stats = DrawStats::default();
        if self.node(id)?.visible {
            self.ensure_updated(id)?;
            self.draw_node(id, frustum, &mut stats);
        }
        Ok(stats)
    }

    fn draw_node(&mut self, id: NodeId, frustum: Option<&Frustum>, stats: &mut DrawStats) {
        if !self.nodes[id].visible {
            return;
        }
        self.update_node(id);
        stats.nodes_visited += 1;

        if let Some(frustum) = frustum.filter(|_| self.nodes[id].is_culling()) {
            let mut refreshed = 0;
            let bounds = self.subtree_bounds(id, &mut refreshed);
            let containment = frustum.classify(&bounds);
            log::trace!("'{}' classified {:?}", self.nodes[id].label(), containment);

            if containment == Containment::Disjoint {
                stats.nodes_culled += 1;
                stats.forced_updates += refreshed;
                return;
            }
        }

        for index in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[index];
            self.draw_node(child, frustum, stats);
        }

        let node = &self.nodes[id];
        for entity in node.entities.iter().filter(|entity| entity.is_visible()) {
            entity.draw(id, &node.local_matrix, &node.world_matrix);
            stats.entities_drawn += 1;
        }
    }
}
