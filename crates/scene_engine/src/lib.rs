//! # Scene Engine
//!
//! A hierarchical scene graph with lazily cached world transforms.
//!
//! ## Features
//!
//! - **Arena Storage**: Nodes live in a slot map and link by key, not by pointer
//! - **Lazy World Transforms**: Cached per node, recomputed only when read after a change
//! - **Non-inherited Scale**: Children inherit translation and rotation, never scale
//! - **Capability Traversals**: Breadth-first draw, load, select and deselect passes
//! - **Configuration**: TOML or RON config files through `serde`
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_engine::prelude::*;
//!
//! let root = EntityHandle::new(Pivot::new("root"));
//! let ship = EntityHandle::new(
//!     Pivot::new("ship").with_transform(Transform::from_position(Vec3::new(0.0, 0.0, -10.0))),
//! );
//! let turret = EntityHandle::new(
//!     Pivot::new("turret").with_transform(Transform::from_position(Vec3::new(0.0, 1.0, 0.0))),
//! );
//!
//! let mut graph = SceneGraph::new(&root);
//! graph.add(&ship, &root)?;
//! graph.add(&turret, &ship)?;
//!
//! let world = graph.world_transform(&turret)?;
//! assert_eq!(world, Mat4::new_translation(&Vec3::new(0.0, 1.0, -10.0)));
//! # Ok::<(), SceneGraphError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        scene::{
            BoundingSphere, Drawable, EntityHandle, Loadable, PickHit, Pivot, Ray, SceneEntity,
            SceneGraph, SceneGraphConfig, SceneGraphError, Selectable,
        },
    };
}
