//! Culling demo application
//!
//! Builds a small field of prop clusters, each under its own culling node,
//! plus a satellite driven by an orbiting transform source. A fixed camera
//! sweeps across the field and the per-frame draw statistics are logged.
//!
//! Usage: `culling_demo [config.toml|config.ron] [frames]`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::Rng;
use scene_graph::foundation::math::Point3;
use scene_graph::prelude::*;

const CLUSTER_COUNT: usize = 12;
const PROPS_PER_CLUSTER: usize = 8;
const FIELD_RADIUS: f32 = 120.0;
const DEFAULT_FRAMES: usize = 240;
const FRAME_DT: f32 = 1.0 / 60.0;

/// Box-shaped prop that only counts its draw calls
struct Prop {
    half_extents: Vec3,
    draws: Cell<usize>,
}

impl Prop {
    fn new(half_extents: Vec3) -> Rc<Self> {
        Rc::new(Self {
            half_extents,
            draws: Cell::new(0),
        })
    }
}

impl Renderable for Prop {
    fn draw(&self, node: NodeId, _local: &Mat4, world: &Mat4) {
        self.draws.set(self.draws.get() + 1);
        log::trace!("Draw prop on {:?} at ({:.1}, {:.1}, {:.1})", node, world.m14, world.m24, world.m34);
    }

    fn bounding_box(&self, _node: NodeId, _local: &Mat4, world: &Mat4) -> AABB {
        AABB::from_center_extents(Vec3::zeros(), self.half_extents).transformed(world)
    }
}

/// Circular orbit standing in for a physics body
struct Orbit {
    center: Vec3,
    radius: f32,
    angular_velocity: f32,
    angle: f32,
    dirty: bool,
}

impl Orbit {
    fn new(center: Vec3, radius: f32, angular_velocity: f32) -> Self {
        Self {
            center,
            radius,
            angular_velocity,
            angle: 0.0,
            dirty: true,
        }
    }

    fn step(&mut self, dt: f32) {
        self.angle += self.angular_velocity * dt;
        self.dirty = true;
    }
}

impl TransformSource for Orbit {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn world_transform(&self) -> Mat4 {
        let offset = Vec3::new(self.angle.cos(), 0.0, self.angle.sin()) * self.radius;
        Mat4::new_translation(&(self.center + offset))
            * Mat4::from_euler_angles(0.0, -self.angle, 0.0)
    }

    fn acknowledge(&mut self) {
        self.dirty = false;
    }
}

struct CullingDemo {
    graph: SceneGraph,
    world_root: NodeId,
    orbit: Rc<RefCell<Orbit>>,
    props: Vec<Rc<Prop>>,
    rebuilds: Rc<Cell<usize>>,
    camera_angle: f32,
}

impl CullingDemo {
    fn new(config: SceneConfig) -> SceneResult<Self> {
        log::info!("Creating culling demo...");
        let mut graph = SceneGraph::with_config(config);
        let world_root = graph.create_named("world", NodeKind::Plain);
        let mut props = Vec::new();
        let mut rng = rand::thread_rng();

        for cluster_index in 0..CLUSTER_COUNT {
            let cluster = graph.create_named(format!("cluster_{cluster_index}"), NodeKind::culling());
            graph.attach(world_root, cluster)?;

            let angle = cluster_index as f32 / CLUSTER_COUNT as f32 * std::f32::consts::TAU;
            let distance = rng.gen_range(FIELD_RADIUS * 0.3..FIELD_RADIUS);
            graph.set_position(cluster, Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance))?;

            for _ in 0..PROPS_PER_CLUSTER {
                let holder = graph.create_plain();
                graph.attach(cluster, holder)?;
                graph.set_position(
                    holder,
                    Vec3::new(
                        rng.gen_range(-6.0..6.0),
                        rng.gen_range(-2.0..2.0),
                        rng.gen_range(-6.0..6.0),
                    ),
                )?;
                graph.set_rotation(holder, Rotation::Euler(Vec3::new(0.0, rng.gen_range(0.0..std::f32::consts::TAU), 0.0)))?;

                let prop = Prop::new(Vec3::new(
                    rng.gen_range(0.5..2.0),
                    rng.gen_range(0.5..2.0),
                    rng.gen_range(0.5..2.0),
                ));
                graph.attach_entity(holder, Rc::clone(&prop) as EntityRef)?;
                props.push(prop);
            }
        }

        let orbit = Rc::new(RefCell::new(Orbit::new(Vec3::zeros(), FIELD_RADIUS * 0.5, 0.8)));
        let satellite_group = graph.create_named("satellite_group", NodeKind::culling());
        graph.attach(world_root, satellite_group)?;
        let satellite = graph.create_named("satellite", NodeKind::linked(true));
        graph.attach(satellite_group, satellite)?;
        graph.set_scale(satellite, Vec3::new(2.0, 2.0, 2.0))?;
        graph.bind_source(satellite, Rc::clone(&orbit) as SourceRef)?;
        let hull = Prop::new(Vec3::new(1.0, 0.5, 1.0));
        graph.attach_entity(satellite, Rc::clone(&hull) as EntityRef)?;
        props.push(hull);

        let rebuilds = Rc::new(Cell::new(0));
        let counter = Rc::clone(&rebuilds);
        graph.add_listener(move |_: &NodeEvent| counter.set(counter.get() + 1));

        log::info!("Scene built with {} nodes and {} props", graph.len(), props.len());
        Ok(Self {
            graph,
            world_root,
            orbit,
            props,
            rebuilds,
            camera_angle: 0.0,
        })
    }

    fn frustum(&self) -> Frustum {
        let eye = Point3::new(0.0, 40.0, 0.0);
        let target = Point3::new(self.camera_angle.cos() * FIELD_RADIUS, 0.0, self.camera_angle.sin() * FIELD_RADIUS);
        let view = Mat4::look_at_rh(&eye, &target, &Vec3::y());
        let projection = Mat4::new_perspective(16.0 / 9.0, 60.0_f32.to_radians(), 0.1, FIELD_RADIUS * 2.0);
        Frustum::from_view_projection(&(projection * view))
    }

    fn run(&mut self, frames: usize) -> SceneResult<DrawStats> {
        log::info!("Running {} frames...", frames);
        let mut totals = DrawStats::default();

        for frame in 0..frames {
            self.orbit.borrow_mut().step(FRAME_DT);
            self.camera_angle += 0.25 * FRAME_DT;

            let frustum = self.frustum();
            let stats = self.graph.draw(self.world_root, Some(&frustum))?;
            if frame % 60 == 0 {
                log::info!(
                    "Frame {}: visited {}, culled {}, drawn {}, forced {}",
                    frame,
                    stats.nodes_visited,
                    stats.nodes_culled,
                    stats.entities_drawn,
                    stats.forced_updates
                );
            }
            totals += stats;
        }

        Ok(totals)
    }
}

fn load_config(path: Option<&str>) -> SceneConfig {
    match path {
        Some(path) => match SceneConfig::load_from_file(path) {
            Ok(config) => {
                log::info!("Loaded scene config from {}", path);
                config
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}, using defaults", path, e);
                SceneConfig::default()
            }
        },
        None => SceneConfig::default(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting scene graph culling demo");

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str));
    let frames = match args.get(2) {
        Some(raw) => raw.parse()?,
        None => DEFAULT_FRAMES,
    };

    let mut demo = CullingDemo::new(config)?;
    let totals = demo.run(frames)?;
    let draw_calls: usize = demo.props.iter().map(|prop| prop.draws.get()).sum();

    log::info!(
        "Done: {} nodes visited, {} subtrees culled, {} draw calls ({} issued to props), {} world rebuilds",
        totals.nodes_visited,
        totals.nodes_culled,
        totals.entities_drawn,
        draw_calls,
        demo.rebuilds.get()
    );
    Ok(())
}
