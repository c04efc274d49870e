//! Orrery demo: a small solar system driven through the scene graph
//!
//! Builds a sun with orbiting planets and moons, animates the orbit pivots for
//! a few frames, "draws" each body by logging its world position, and picks
//! with a camera ray.
//!
//! Usage: `orrery_demo [config.toml|config.ron]`

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use rand::Rng;
use scene_engine::config::{Config, ConfigError};
use scene_engine::foundation::logging;
use scene_engine::foundation::math::{constants::TAU, Mat4Ext};
use scene_engine::prelude::*;
use thiserror::Error;

const FRAME_COUNT: usize = 4;
const FRAME_TIME: f32 = 0.25;
const CAMERA_DISTANCE: f32 = 40.0;

/// (name, orbit radius, orbit speed in radians per second, body radius, moons)
const PLANETS: &[(&str, f32, f32, f32, &[(&str, f32, f32)])] = &[
    ("rocky", 6.0, 1.2, 0.6, &[]),
    ("blue", 11.0, 0.8, 1.0, &[("pale", 2.0, 3.0)]),
    ("giant", 18.0, 0.4, 2.5, &[("ember", 3.5, 2.0), ("frost", 5.0, 1.1)]),
];

#[derive(Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene graph error: {0}")]
    SceneGraph(#[from] SceneGraphError),
}

/// A drawn, pickable sphere
struct CelestialBody {
    name: String,
    transform: Transform,
    bounds: BoundingSphere,
    selected: bool,
    loaded: bool,
}

impl CelestialBody {
    fn new(name: &str, radius: f32) -> Self {
        Self {
            name: name.to_owned(),
            transform: Transform::identity().with_uniform_scale(radius),
            bounds: BoundingSphere::new(Vec3::zeros(), 1.0),
            selected: false,
            loaded: false,
        }
    }
}

impl SceneEntity for CelestialBody {
    fn local_transform(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn drawable(&mut self) -> Option<&mut dyn Drawable> {
        Some(self)
    }

    fn selectable(&mut self) -> Option<&mut dyn Selectable> {
        Some(self)
    }

    fn loadable(&mut self) -> Option<&mut dyn Loadable> {
        Some(self)
    }
}

impl CelestialBody {
    /// One log line for this frame, or `None` before the mesh is loaded
    fn describe(&self, view: &Mat4, projection: &Mat4, world: &Mat4) -> Option<String> {
        if !self.loaded {
            return None;
        }

        let clip = projection * view * world.column(3);
        Some(format!(
            "draw {:<6} world ({:>6.2}, {:>6.2}, {:>6.2}) depth {:.3}{}",
            self.name,
            world[(0, 3)],
            world[(1, 3)],
            world[(2, 3)],
            clip.z / clip.w,
            if self.selected { " [selected]" } else { "" }
        ))
    }
}

impl Drawable for CelestialBody {
    fn draw(&mut self, view: &Mat4, projection: &Mat4, world: &Mat4) {
        match self.describe(view, projection, world) {
            Some(line) => log::info!("  {}", line),
            None => log::warn!("Skipping {}: mesh not loaded", self.name),
        }
    }
}

impl Selectable for CelestialBody {
    fn intersects(&self, ray: &Ray, world: &Mat4) -> Option<f32> {
        self.bounds.transformed(world).intersect_ray(ray)
    }

    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl Loadable for CelestialBody {
    fn load_content(&mut self) {
        log::debug!("Loading mesh for {}", self.name);
        self.loaded = true;
    }
}

/// Rotating pivot a body hangs off; spinning it moves the body along its orbit
struct Orbit {
    pivot: Rc<RefCell<Pivot>>,
    handle: EntityHandle,
    angle: f32,
    speed: f32,
}

impl Orbit {
    fn new(name: &str, phase: f32, speed: f32) -> Self {
        let pivot = Rc::new(RefCell::new(Pivot::new(name)));
        let handle = EntityHandle::from(Rc::clone(&pivot));
        let orbit = Self { pivot, handle, angle: phase, speed };
        orbit.apply();
        orbit
    }

    fn advance(&mut self, delta_time: f32) {
        self.angle = (self.angle + self.speed * delta_time) % TAU;
        self.apply();
    }

    fn apply(&self) {
        self.pivot.borrow_mut().transform =
            Transform::identity().with_rotation_axis_angle(Vec3::y(), self.angle);
    }
}

struct Orrery {
    graph: SceneGraph,
    orbits: Vec<Orbit>,
}

impl Orrery {
    fn build(config: SceneGraphConfig) -> Result<Self, DemoError> {
        let mut rng = rand::thread_rng();
        let root = EntityHandle::new(Pivot::new("system"));
        let mut graph = SceneGraph::with_config(&root, config);
        let mut orbits = Vec::new();

        let sun = EntityHandle::new(CelestialBody::new("sun", 3.0));
        graph.add(&sun, &root)?;

        for &(name, distance, speed, radius, moons) in PLANETS {
            let orbit = Orbit::new(&format!("{name}-orbit"), rng.gen_range(0.0..TAU), speed);
            graph.add(&orbit.handle, &sun)?;

            let mut planet = CelestialBody::new(name, radius);
            planet.transform.position = Vec3::new(distance, 0.0, 0.0);
            let planet = EntityHandle::new(planet);
            graph.add(&planet, &orbit.handle)?;
            orbits.push(orbit);

            for &(moon_name, moon_distance, moon_speed) in moons {
                let moon_orbit = Orbit::new(&format!("{moon_name}-orbit"), rng.gen_range(0.0..TAU), moon_speed);
                graph.add(&moon_orbit.handle, &planet)?;

                let mut moon = CelestialBody::new(moon_name, 0.3);
                moon.transform.position = Vec3::new(moon_distance, 0.0, 0.0);
                graph.add(&EntityHandle::new(moon), &moon_orbit.handle)?;
                orbits.push(moon_orbit);
            }
        }

        log::info!("Built orrery with {} scene nodes", graph.node_count());
        Ok(Self { graph, orbits })
    }

    fn update(&mut self, delta_time: f32) {
        for orbit in &mut self.orbits {
            orbit.advance(delta_time);
            self.graph.notify_transform_changed(&orbit.handle);
        }
    }

    fn pick(&mut self, ray: &Ray) {
        self.graph.deselect_all();
        match self.graph.select_hit(ray) {
            Some(hit) => {
                log::info!("Picked {} at distance {:.2}", hit.entity.name(), hit.distance);
                let mut picked = hit.entity.borrow_mut();
                if let Some(selectable) = picked.selectable() {
                    selectable.set_selected(true);
                }
            }
            None => log::info!("Pick ray hit nothing"),
        }
    }
}

/// Drawable entities strictly below `entity`; orbit pivots are not counted
fn bodies_under(graph: &SceneGraph, entity: &EntityHandle) -> Result<usize, SceneGraphError> {
    let subtree = graph.entities_breadth_first_from(entity)?;
    Ok(subtree
        .iter()
        .skip(1)
        .filter(|node| node.borrow_mut().drawable().is_some())
        .count())
}

fn run(config_path: Option<PathBuf>) -> Result<(), DemoError> {
    let config = SceneGraphConfig::load_or_default(config_path.as_deref())?;
    log::info!("Scene graph config: {:?}", config);

    let mut orrery = Orrery::build(config)?;
    orrery.graph.load_content();

    let eye = Vec3::new(0.0, CAMERA_DISTANCE * 0.5, CAMERA_DISTANCE);
    let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());
    let projection = Mat4::perspective(TAU / 8.0, 16.0 / 9.0, 0.1, 200.0);
    let ray = Ray::new(eye, -eye);

    for frame in 0..FRAME_COUNT {
        log::info!("Frame {}", frame);
        orrery.update(FRAME_TIME);
        orrery.pick(&ray);
        orrery.graph.draw(&view, &projection);
    }

    if let Some(giant) = orrery.graph.find_by_name("giant") {
        let moons = bodies_under(&orrery.graph, &giant)?;
        let removed = orrery.graph.remove(&giant)?;
        log::info!(
            "Removed {} with {} descendant nodes ({} of them bodies)",
            giant.name(),
            removed.len() - 1,
            moons
        );
    }
    log::info!("{} scene nodes remain", orrery.graph.node_count());

    Ok(())
}

fn main() {
    logging::init_with_filter("info");
    log::info!("Starting orrery demo");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    if let Err(error) = run(config_path) {
        log::error!("Orrery demo failed: {}", error);
        std::process::exit(1);
    }
}
