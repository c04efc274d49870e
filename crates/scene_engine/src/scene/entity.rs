//! Scene entities and their capabilities
//!
//! Entities are owned by the application and shared with the scene graph
//! through [`EntityHandle`]. Each entity supplies a local transform and may
//! expose any of three capabilities the graph's traversals act on:
//!
//! - [`Drawable`]: receives view, projection and its world transform
//! - [`Selectable`]: answers ray picking queries and carries a selection flag
//! - [`Loadable`]: loads its content once during [`SceneGraph::load_content`]
//!
//! [`SceneGraph::load_content`]: super::SceneGraph::load_content

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::foundation::math::{Mat4, Transform};
use super::picking::Ray;

/// Something the renderer can draw
pub trait Drawable {
    /// Draw with the given camera matrices and the entity's world transform
    fn draw(&mut self, view: &Mat4, projection: &Mat4, world: &Mat4);
}

/// Something that can be picked with a ray
pub trait Selectable {
    /// Distance along `ray` to the hit point, if the entity placed at `world` is hit
    fn intersects(&self, ray: &Ray, world: &Mat4) -> Option<f32>;

    /// Whether the entity is currently selected
    fn is_selected(&self) -> bool;

    /// Set the selection flag
    fn set_selected(&mut self, selected: bool);
}

/// Something with content to load before first use
pub trait Loadable {
    /// Load content; invoked once per [`SceneGraph::load_content`](super::SceneGraph::load_content) pass
    fn load_content(&mut self);
}

/// An object that can live in the scene graph
///
/// Capabilities are reported through the accessor methods rather than by type
/// inspection. An entity that is drawable returns `Some(self)` from
/// [`SceneEntity::drawable`], and so on.
pub trait SceneEntity {
    /// Transform relative to the parent entity
    fn local_transform(&self) -> Mat4;

    /// Human-readable name used in logs and errors
    fn name(&self) -> &str {
        "entity"
    }

    /// Drawable capability, if any
    fn drawable(&mut self) -> Option<&mut dyn Drawable> {
        None
    }

    /// Selectable capability, if any
    fn selectable(&mut self) -> Option<&mut dyn Selectable> {
        None
    }

    /// Loadable capability, if any
    fn loadable(&mut self) -> Option<&mut dyn Loadable> {
        None
    }
}

/// Shared, identity-compared reference to an application-owned entity
///
/// Two handles are equal only when they point at the same entity, no matter
/// what the entities contain. Cloning a handle is cheap and yields an equal
/// handle.
#[derive(Clone)]
pub struct EntityHandle(Rc<RefCell<dyn SceneEntity>>);

impl EntityHandle {
    /// Wrap a freshly created entity
    pub fn new<E: SceneEntity + 'static>(entity: E) -> Self {
        Self(Rc::new(RefCell::new(entity)))
    }

    /// Immutably borrow the entity
    ///
    /// # Panics
    /// Panics if the entity is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, dyn SceneEntity> {
        self.0.borrow()
    }

    /// Mutably borrow the entity
    ///
    /// # Panics
    /// Panics if the entity is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn SceneEntity> {
        self.0.borrow_mut()
    }

    /// The entity's name, or a placeholder while it is mutably borrowed
    pub fn name(&self) -> String {
        self.0
            .try_borrow()
            .map_or_else(|_| String::from("<borrowed>"), |entity| entity.name().to_owned())
    }

    fn address(&self) -> *const () {
        Rc::as_ptr(&self.0).cast::<()>()
    }
}

impl<E: SceneEntity + 'static> From<Rc<RefCell<E>>> for EntityHandle {
    fn from(entity: Rc<RefCell<E>>) -> Self {
        Self(entity)
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for EntityHandle {}

impl Hash for EntityHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("name", &self.name())
            .field("address", &self.address())
            .finish()
    }
}

/// Plain transform-only entity, useful as a scene root or grouping node
#[derive(Debug, Clone, Default)]
pub struct Pivot {
    /// Name reported to logs
    pub name: String,
    /// Local transform
    pub transform: Transform,
}

impl Pivot {
    /// Create a pivot at the origin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
        }
    }

    /// Builder pattern: Set the local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

impl SceneEntity for Pivot {
    fn local_transform(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use std::collections::HashSet;

    #[test]
    fn test_handles_compare_by_identity() {
        let first = EntityHandle::new(Pivot::new("twin"));
        let second = EntityHandle::new(Pivot::new("twin"));

        assert_eq!(first, first.clone());
        assert_ne!(first, second);

        let set: HashSet<_> = [first.clone(), second, first].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_handle_from_shared_entity_keeps_identity() {
        let shared = Rc::new(RefCell::new(Pivot::new("shared")));
        let a = EntityHandle::from(Rc::clone(&shared));
        let b = EntityHandle::from(Rc::clone(&shared));

        assert_eq!(a, b);

        shared.borrow_mut().transform.position = Vec3::new(3.0, 0.0, 0.0);
        assert_eq!(a.borrow().local_transform()[(0, 3)], 3.0);
    }

    #[test]
    fn test_name_while_mutably_borrowed() {
        let handle = EntityHandle::new(Pivot::new("busy"));
        assert_eq!(handle.name(), "busy");

        let _guard = handle.borrow_mut();
        assert_eq!(handle.name(), "<borrowed>");
    }

    #[test]
    fn test_pivot_has_no_capabilities() {
        let handle = EntityHandle::new(Pivot::new("plain"));
        let mut entity = handle.borrow_mut();

        assert!(entity.drawable().is_none());
        assert!(entity.selectable().is_none());
        assert!(entity.loadable().is_none());
    }
}
