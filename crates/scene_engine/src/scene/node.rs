//! Arena node record for the scene graph

use crate::foundation::math::Mat4;
use super::entity::EntityHandle;

slotmap::new_key_type! {
    /// Index of a node in the scene graph arena
    pub(crate) struct NodeKey;
}

/// One entity's place in the hierarchy
///
/// Parent and children are arena keys, so the tree holds no owning cycles.
#[derive(Debug)]
pub(crate) struct SceneNode {
    pub(crate) entity: EntityHandle,
    pub(crate) parent: Option<NodeKey>,
    /// Insertion order
    pub(crate) children: Vec<NodeKey>,
    /// `None` while stale
    pub(crate) world_transform: Option<Mat4>,
}

impl SceneNode {
    pub(crate) fn new(entity: EntityHandle, parent: Option<NodeKey>) -> Self {
        Self {
            entity,
            parent,
            children: Vec::new(),
            world_transform: None,
        }
    }

    pub(crate) fn local_transform(&self) -> Mat4 {
        self.entity.borrow().local_transform()
    }
}
