//! Caching protocol, structure edits and plain traversal

use super::*;
use crate::foundation::math::{AxisOrder, CompositionOrder, Rotation, Transform};
use crate::scene::{DrawStats, NodeKind, SceneError, UpdateOrigin};
use approx::assert_relative_eq;

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> a -> b, returned in that order
    fn chain(graph: &mut SceneGraph) -> (NodeId, NodeId, NodeId) {
        let root = graph.create_named("root", NodeKind::Plain);
        let a = graph.create_named("a", NodeKind::Plain);
        let b = graph.create_named("b", NodeKind::Plain);
        graph.attach(root, a).unwrap();
        graph.attach(a, b).unwrap();
        (root, a, b)
    }

    #[test]
    fn test_grandchild_translation_follows_ancestor_edit() {
        let mut graph = SceneGraph::new();
        let (_root, a, b) = chain(&mut graph);
        graph.set_position(a, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        graph.set_position(b, Vec3::new(0.0, 10.0, 0.0)).unwrap();

        assert_relative_eq!(world_translation(&mut graph, b), Vec3::new(10.0, 10.0, 0.0));
        let a_version = graph.version(a).unwrap();
        let b_version = graph.version(b).unwrap();

        graph.set_position(a, Vec3::zeros()).unwrap();

        assert_relative_eq!(world_translation(&mut graph, b), Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(graph.version(a).unwrap(), a_version + 1);
        assert_eq!(graph.version(b).unwrap(), b_version + 1);
    }

    #[test]
    fn test_repeated_reads_are_idempotent() {
        let mut graph = SceneGraph::new();
        let (_root, a, b) = chain(&mut graph);
        graph.set_position(a, Vec3::new(1.0, 2.0, 3.0)).unwrap();

        assert!(graph.ensure_updated(b).unwrap());
        let first = graph.world_matrix(b).unwrap();
        let version = graph.version(b).unwrap();

        assert!(!graph.ensure_updated(b).unwrap());
        assert_eq!(graph.world_matrix(b).unwrap(), first);
        assert_eq!(graph.local_matrix(b).unwrap(), *graph.node(b).unwrap().cached_local_matrix());
        assert_eq!(graph.version(b).unwrap(), version);
    }

    #[test]
    fn test_cached_chain_matches_full_recomputation() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        let transforms = [
            Transform {
                position: Vec3::new(1.0, -2.0, 0.5),
                rotation: Rotation::Euler(Vec3::new(0.2, 0.4, -0.1)),
                scale: Vec3::new(2.0, 1.0, 1.0),
                ..Default::default()
            },
            Transform {
                position: Vec3::new(0.0, 3.0, 0.0),
                rotation: Rotation::Euler(Vec3::new(-0.5, 0.0, 0.9)),
                axis_order: AxisOrder::Zxy,
                ..Default::default()
            },
            Transform {
                position: Vec3::new(4.0, 0.0, -1.0),
                scale: Vec3::new(0.5, 0.5, 0.5),
                composition_order: CompositionOrder::Rts,
                ..Default::default()
            },
        ];
        for (id, transform) in [root, a, b].into_iter().zip(transforms.iter()) {
            graph.set_transform(id, transform.clone()).unwrap();
        }
        graph.world_matrix(b).unwrap();

        // Only the root changes; a and b are never marked dirty
        graph.set_position(root, Vec3::new(-7.0, 1.0, 2.0)).unwrap();
        assert!(!graph.node(b).unwrap().is_dirty());

        let expected = graph.transform(root).unwrap().to_matrix()
            * transforms[1].to_matrix()
            * transforms[2].to_matrix();
        assert_relative_eq!(graph.world_matrix(b).unwrap(), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_version_counts_rebuilds_not_edits() {
        let mut graph = SceneGraph::new();
        let node = graph.create_plain();
        graph.world_matrix(node).unwrap();
        assert_eq!(graph.version(node).unwrap(), 1);

        graph.set_position(node, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        graph.set_scale(node, Vec3::new(2.0, 2.0, 2.0)).unwrap();
        graph.set_axis_order(node, AxisOrder::Yzx).unwrap();
        graph.mark_dirty(node).unwrap();
        assert_eq!(graph.version(node).unwrap(), 1);

        graph.world_matrix(node).unwrap();
        graph.world_matrix(node).unwrap();
        assert_eq!(graph.version(node).unwrap(), 2);
    }

    #[test]
    fn test_root_world_equals_local() {
        let mut graph = SceneGraph::new();
        let node = graph.create_plain();
        graph.set_rotation(node, Rotation::Euler(Vec3::new(0.3, 0.2, 0.1))).unwrap();
        graph.set_position(node, Vec3::new(3.0, 4.0, 5.0)).unwrap();

        assert_eq!(graph.world_matrix(node).unwrap(), graph.local_matrix(node).unwrap());
    }

    #[test]
    fn test_reparent_reflects_new_parent_without_edits() {
        let mut graph = SceneGraph::new();
        let p = graph.create_plain();
        let q = graph.create_plain();
        let child = graph.create_plain();
        graph.set_position(p, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        graph.set_position(q, Vec3::new(0.0, 0.0, 7.0)).unwrap();
        graph.set_position(child, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        graph.attach(p, child).unwrap();
        assert_relative_eq!(world_translation(&mut graph, child), Vec3::new(5.0, 1.0, 0.0));
        graph.world_matrix(q).unwrap();

        graph.detach(p, child).unwrap();
        graph.attach(q, child).unwrap();

        assert_relative_eq!(world_translation(&mut graph, child), Vec3::new(0.0, 1.0, 7.0));
    }

    #[test]
    fn test_detached_node_becomes_root_again() {
        let mut graph = SceneGraph::new();
        let (_root, a, b) = chain(&mut graph);
        graph.set_position(a, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        graph.set_position(b, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        graph.world_matrix(b).unwrap();
        let version = graph.version(b).unwrap();

        graph.detach(a, b).unwrap();

        assert_relative_eq!(world_translation(&mut graph, b), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(graph.version(b).unwrap(), version + 1);
        assert!(graph.roots().contains(&b));
        assert!(graph.node(a).unwrap().children().is_empty());
    }

    #[test]
    fn test_reparent_helper_moves_between_parents() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        graph.set_position(root, Vec3::new(0.0, 0.0, 1.0)).unwrap();
        graph.set_position(a, Vec3::new(9.0, 0.0, 0.0)).unwrap();

        graph.reparent(b, root).unwrap();

        assert_eq!(graph.node(b).unwrap().parent(), Some(root));
        assert_eq!(graph.node(root).unwrap().children(), &[a, b]);
        assert_relative_eq!(world_translation(&mut graph, b), Vec3::new(0.0, 0.0, 1.0));
        assert!(graph.reparent(b, root).is_ok());
    }

    #[test]
    fn test_attach_already_parented_fails_without_mutation() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);

        assert_eq!(
            graph.attach(root, b),
            Err(SceneError::AlreadyParented { child: b, parent: a })
        );
        assert_eq!(graph.node(root).unwrap().children(), &[a]);
        assert_eq!(graph.node(b).unwrap().parent(), Some(a));
    }

    #[test]
    fn test_detach_from_wrong_parent_fails() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);

        assert_eq!(graph.detach(root, b), Err(SceneError::NotAChild { child: b, parent: root }));
        assert_eq!(graph.node(b).unwrap().parent(), Some(a));
    }

    #[test]
    fn test_cycles_are_rejected_before_mutation() {
        let mut graph = SceneGraph::new();
        let (root, _a, b) = chain(&mut graph);

        assert_eq!(graph.attach(root, root), Err(SceneError::CycleDetected { child: root, parent: root }));
        assert_eq!(graph.attach(b, root), Err(SceneError::CycleDetected { child: root, parent: b }));
        assert_eq!(graph.reparent(root, b), Err(SceneError::CycleDetected { child: root, parent: b }));
        assert_eq!(graph.roots(), &[root]);
        assert!(graph.node(b).unwrap().children().is_empty());
    }

    #[test]
    fn test_remove_node_destroys_subtree() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        let other = graph.create_plain();

        assert_eq!(graph.remove_node(a).unwrap(), 2);

        assert!(!graph.contains(a));
        assert!(!graph.contains(b));
        assert!(graph.node(root).unwrap().children().is_empty());
        assert_eq!(graph.roots(), &[root, other]);
        assert_eq!(graph.world_matrix(b), Err(SceneError::NodeNotFound(b)));
        assert_eq!(graph.remove_node(a), Err(SceneError::NodeNotFound(a)));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_listeners_hear_each_rebuild_once() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        let events = record_events(&mut graph);

        graph.world_matrix(b).unwrap();
        graph.world_matrix(b).unwrap();
        let nodes: Vec<NodeId> = events.borrow().iter().map(|event| event.node).collect();
        assert_eq!(nodes, vec![root, a, b]);
        assert!(events.borrow().iter().all(|event| event.origin == UpdateOrigin::Local && event.version == 1));

        graph.set_position(b, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        graph.world_matrix(b).unwrap();
        assert_eq!(events.borrow().len(), 4);
        assert_eq!(events.borrow()[3].node, b);
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let mut graph = SceneGraph::new();
        let node = graph.create_plain();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let listener = graph.add_listener(move |_: &NodeEvent| counter.set(counter.get() + 1));

        graph.world_matrix(node).unwrap();
        assert!(graph.remove_listener(listener));
        graph.mark_dirty(node).unwrap();
        graph.world_matrix(node).unwrap();

        assert_eq!(count.get(), 1);
        assert!(!graph.remove_listener(listener));
    }

    #[test]
    fn test_empty_node_bounds_are_empty_sentinel() {
        let mut graph = SceneGraph::new();
        let (root, _a, _b) = chain(&mut graph);

        assert!(graph.bounding_box(root).unwrap().is_empty());
    }

    #[test]
    fn test_plain_bounds_aggregate_children_in_world_space() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        graph.set_position(a, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        graph.attach_entity(root, as_entity(&BoxEntity::unit())).unwrap();
        graph.attach_entity(b, as_entity(&BoxEntity::unit())).unwrap();

        let bounds = graph.bounding_box(root).unwrap();

        assert_relative_eq!(bounds.min, Vec3::zeros());
        assert_relative_eq!(bounds.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_draw_visits_children_before_own_entities() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        let log = Rc::new(RefCell::new(Vec::new()));
        graph.attach_entity(root, as_entity(&BoxEntity::logged("root", &log))).unwrap();
        graph.attach_entity(a, as_entity(&BoxEntity::logged("a", &log))).unwrap();
        graph.attach_entity(b, as_entity(&BoxEntity::logged("b", &log))).unwrap();

        let stats = graph.draw(root, None).unwrap();

        assert_eq!(*log.borrow(), vec!["b", "a", "root"]);
        assert_eq!(stats.nodes_visited, 3);
        assert_eq!(stats.entities_drawn, 3);
    }

    #[test]
    fn test_invisible_nodes_and_entities_are_skipped() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        let hidden_entity = BoxEntity::unit();
        hidden_entity.visible.set(false);
        let shown = BoxEntity::unit();
        let under_hidden = BoxEntity::unit();
        graph.attach_entity(root, as_entity(&hidden_entity)).unwrap();
        graph.attach_entity(root, as_entity(&shown)).unwrap();
        graph.attach_entity(b, as_entity(&under_hidden)).unwrap();
        graph.set_visible(a, false).unwrap();

        let stats = graph.draw(root, None).unwrap();

        assert_eq!(stats.nodes_visited, 1);
        assert_eq!(hidden_entity.draws.get(), 0);
        assert_eq!(shown.draws.get(), 1);
        assert_eq!(under_hidden.draws.get(), 0);

        graph.set_visible(root, false).unwrap();
        assert_eq!(graph.draw(root, None).unwrap(), DrawStats::default());
    }

    #[test]
    fn test_force_update_refreshes_hidden_subtree() {
        let mut graph = SceneGraph::new();
        let (root, a, b) = chain(&mut graph);
        graph.set_visible(a, false).unwrap();
        graph.draw(root, None).unwrap();
        graph.set_position(b, Vec3::new(0.0, 0.0, 3.0)).unwrap();

        assert_eq!(graph.force_update(root).unwrap(), 2);

        let cached = translation_of(graph.node(b).unwrap().cached_world_matrix());
        assert_relative_eq!(cached, Vec3::new(0.0, 0.0, 3.0));
        assert!(!graph.node(b).unwrap().is_dirty());
        assert_eq!(graph.update_all().unwrap(), 0);
    }

    #[test]
    fn test_draw_all_covers_every_root() {
        let mut graph = SceneGraph::new();
        let first = graph.create_plain();
        let second = graph.create_plain();
        let one = BoxEntity::unit();
        let two = BoxEntity::unit();
        graph.attach_entity(first, as_entity(&one)).unwrap();
        graph.attach_entity(second, as_entity(&two)).unwrap();

        let stats = graph.draw_all(None).unwrap();

        assert_eq!(stats.entities_drawn, 2);
        assert_eq!((one.draws.get(), two.draws.get()), (1, 1));
    }

    #[test]
    fn test_new_nodes_use_configured_orders() {
        let config = crate::config::SceneConfig::default()
            .with_default_orders(AxisOrder::Zyx, CompositionOrder::Trs);
        let mut graph = SceneGraph::with_config(config);
        let node = graph.create_plain();

        let transform = graph.transform(node).unwrap();
        assert_eq!(transform.axis_order, AxisOrder::Zyx);
        assert_eq!(transform.composition_order, CompositionOrder::Trs);
    }
}
