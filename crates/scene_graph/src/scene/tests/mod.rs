//! Scenario tests for the transform hierarchy, culling and linked nodes
//!
//! Shared mocks live here; each submodule covers one node behavior.

mod hierarchy;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::foundation::math::{translation_of, Mat4, Vec3};
use crate::scene::{EntityRef, NodeEvent, NodeId, Renderable, SceneGraph, TransformSource, AABB};

/// Box-shaped entity that counts its draws
pub(super) struct BoxEntity {
    pub local_bounds: AABB,
    pub visible: Cell<bool>,
    pub draws: Cell<usize>,
    pub draw_log: Option<Rc<RefCell<Vec<&'static str>>>>,
    pub label: &'static str,
}

impl BoxEntity {
    pub fn new(min: Vec3, max: Vec3) -> Rc<Self> {
        Rc::new(Self {
            local_bounds: AABB::new(min, max),
            visible: Cell::new(true),
            draws: Cell::new(0),
            draw_log: None,
            label: "box",
        })
    }

    pub fn unit() -> Rc<Self> {
        Self::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))
    }

    pub fn logged(label: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Rc<Self> {
        Rc::new(Self {
            local_bounds: AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)),
            visible: Cell::new(true),
            draws: Cell::new(0),
            draw_log: Some(Rc::clone(log)),
            label,
        })
    }
}

impl Renderable for BoxEntity {
    fn draw(&self, _node: NodeId, _local: &Mat4, _world: &Mat4) {
        self.draws.set(self.draws.get() + 1);
        if let Some(log) = &self.draw_log {
            log.borrow_mut().push(self.label);
        }
    }

    fn bounding_box(&self, _node: NodeId, _local: &Mat4, world: &Mat4) -> AABB {
        self.local_bounds.transformed(world)
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

/// Upcast for attaching
pub(super) fn as_entity(entity: &Rc<BoxEntity>) -> EntityRef {
    Rc::clone(entity) as EntityRef
}

/// Scripted external transform provider
pub(super) struct MockSource {
    pub world: Mat4,
    pub dirty: bool,
    pub acknowledged: usize,
}

impl MockSource {
    pub fn at(position: Vec3) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            world: Mat4::new_translation(&position),
            dirty: true,
            acknowledged: 0,
        }))
    }

    /// Simulate a physics step moving the body
    pub fn move_to(&mut self, world: Mat4) {
        self.world = world;
        self.dirty = true;
    }
}

impl TransformSource for MockSource {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn world_transform(&self) -> Mat4 {
        self.world
    }

    fn acknowledge(&mut self) {
        self.dirty = false;
        self.acknowledged += 1;
    }
}

/// Register a listener that records every event
pub(super) fn record_events(graph: &mut SceneGraph) -> Rc<RefCell<Vec<NodeEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    graph.add_listener(move |event: &NodeEvent| sink.borrow_mut().push(*event));
    events
}

/// World translation of a node after refreshing
pub(super) fn world_translation(graph: &mut SceneGraph, id: NodeId) -> Vec3 {
    translation_of(&graph.world_matrix(id).unwrap())
}
