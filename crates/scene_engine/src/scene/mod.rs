//! Scene graph system
//!
//! A tree of application-owned entities with lazily cached world transforms.
//!
//! ## Architecture
//!
//! ```text
//! Application (owns entities, mutates local transforms)
//!      ↓ add / remove / reparent / notify_transform_changed
//! SceneGraph (node arena + entity lookup + world transform cache)
//!      ↓ breadth-first traversal
//! Drawable / Selectable / Loadable capabilities
//! ```

mod entity;
mod node;
mod picking;
mod scene_graph;

pub use entity::{Drawable, EntityHandle, Loadable, Pivot, SceneEntity, Selectable};
pub use picking::{BoundingSphere, PickHit, Ray};
pub use scene_graph::{Result, SceneGraph, SceneGraphConfig, SceneGraphError, MAX_INITIAL_CAPACITY};
