//! Hierarchical scene graph with lazily cached world transforms
//!
//! Nodes live in a slot-map arena and reference each other by key; a hash map
//! from [`EntityHandle`] to node key gives O(1) lookup by entity identity. The
//! arena and the lookup table always hold exactly the same set of entities.
//!
//! World transforms are memoized per node and recomputed on demand:
//!
//! ```text
//! world(root)   = local(root)
//! world(entity) = without_scale(world(parent)) * local(entity)
//! ```
//!
//! Scale never propagates down the hierarchy; only translation and rotation
//! do. Changing an entity's local transform must be followed by
//! [`SceneGraph::notify_transform_changed`], which clears the cached values of
//! the entity and its whole subtree. They are recomputed the next time they
//! are read.
//!
//! A cached node always has cached ancestors: lazy resolution caches the whole
//! chain it walks, and invalidation clears whole subtrees.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;

use crate::config::Config;
use crate::foundation::math::{self, Mat4};
use super::entity::EntityHandle;
use super::node::{NodeKey, SceneNode};
use super::picking::{PickHit, Ray};

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneGraphError {
    /// The entity has no node in this graph
    #[error("Entity not found in scene graph: {0}")]
    NotFound(String),

    /// The entity already has a node in this graph
    #[error("Entity already in scene graph: {0}")]
    AlreadyInGraph(String),

    /// The root is fixed for the lifetime of the graph
    #[error("The root entity cannot be removed from the scene graph")]
    RootRemoval,

    /// The root is fixed for the lifetime of the graph
    #[error("The root entity cannot be reparented")]
    RootReparent,

    /// The requested parent lies inside the entity's own subtree
    #[error("Reparenting {0} under its own subtree would create a cycle")]
    CycleDetected(String),
}

/// Result alias for scene graph operations
pub type Result<T> = std::result::Result<T, SceneGraphError>;

/// Upper bound on [`SceneGraphConfig::initial_capacity`]; larger requests are clamped
pub const MAX_INITIAL_CAPACITY: usize = 1 << 16;

/// Scene graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphConfig {
    /// Number of nodes to reserve space for up front, at most [`MAX_INITIAL_CAPACITY`]
    pub initial_capacity: usize,

    /// Hits farther along the pick ray than this are ignored by `select`
    pub max_pick_distance: Option<f32>,
}

impl Default for SceneGraphConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_pick_distance: None,
        }
    }
}

impl Config for SceneGraphConfig {}

/// Tree of entities with cached world transforms
///
/// The graph owns its nodes but not the entities; those are shared with the
/// application through [`EntityHandle`]. Everything runs synchronously on the
/// calling thread.
#[derive(Debug)]
pub struct SceneGraph {
    config: SceneGraphConfig,
    nodes: SlotMap<NodeKey, SceneNode>,
    // EntityHandle hashes by address, not by the entity's contents
    #[allow(clippy::mutable_key_type)]
    lookup: HashMap<EntityHandle, NodeKey>,
    root: NodeKey,
}

impl SceneGraph {
    /// Create a graph rooted at `root` with the default configuration
    pub fn new(root: &EntityHandle) -> Self {
        Self::with_config(root, SceneGraphConfig::default())
    }

    /// Create a graph rooted at `root`
    pub fn with_config(root: &EntityHandle, config: SceneGraphConfig) -> Self {
        let capacity = config.initial_capacity.min(MAX_INITIAL_CAPACITY);
        if capacity < config.initial_capacity {
            log::warn!(
                "Clamping scene graph initial capacity from {} to {}",
                config.initial_capacity,
                capacity
            );
        }

        let mut graph = Self {
            config,
            nodes: SlotMap::with_capacity_and_key(capacity),
            lookup: HashMap::with_capacity(capacity),
            root: NodeKey::default(),
        };
        graph.initialise(root);
        graph
    }

    /// Discard the whole tree and start over with `root` as its only node
    pub fn initialise(&mut self, root: &EntityHandle) {
        log::debug!(
            "Initialising scene graph with root {} (discarding {} nodes)",
            root.name(),
            self.nodes.len()
        );

        self.nodes.clear();
        self.lookup.clear();
        self.root = self.nodes.insert(SceneNode::new(root.clone(), None));
        self.lookup.insert(root.clone(), self.root);
    }

    /// The graph's configuration
    pub const fn config(&self) -> &SceneGraphConfig {
        &self.config
    }

    /// The root entity
    pub fn root(&self) -> EntityHandle {
        self.nodes[self.root].entity.clone()
    }

    /// Number of entities in the graph, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `entity` has a node in this graph
    pub fn contains(&self, entity: &EntityHandle) -> bool {
        self.lookup.contains_key(entity)
    }

    /// Parent of `entity`, or `None` for the root
    pub fn parent_of(&self, entity: &EntityHandle) -> Result<Option<EntityHandle>> {
        let key = self.key_of(entity)?;
        Ok(self.nodes[key].parent.map(|parent| self.nodes[parent].entity.clone()))
    }

    /// Direct children of `entity` in insertion order
    pub fn children_of(&self, entity: &EntityHandle) -> Result<Vec<EntityHandle>> {
        let key = self.key_of(entity)?;
        Ok(self.nodes[key]
            .children
            .iter()
            .map(|&child| self.nodes[child].entity.clone())
            .collect())
    }

    /// Add `entity` as the last child of `parent`
    ///
    /// The new entity starts without a cached world transform.
    pub fn add(&mut self, entity: &EntityHandle, parent: &EntityHandle) -> Result<()> {
        let parent_key = self.key_of(parent)?;
        if self.lookup.contains_key(entity) {
            return Err(SceneGraphError::AlreadyInGraph(entity.name()));
        }

        let key = self.nodes.insert(SceneNode::new(entity.clone(), Some(parent_key)));
        self.nodes[parent_key].children.push(key);
        self.lookup.insert(entity.clone(), key);

        log::debug!("Added {} under {}", entity.name(), parent.name());
        Ok(())
    }

    /// Remove `entity` and its whole subtree
    ///
    /// Returns the removed entities in breadth-first order, `entity` first.
    pub fn remove(&mut self, entity: &EntityHandle) -> Result<Vec<EntityHandle>> {
        let key = self.key_of(entity)?;
        if key == self.root {
            return Err(SceneGraphError::RootRemoval);
        }

        let subtree = self.breadth_first_keys(key);
        if let Some(parent) = self.nodes[key].parent {
            self.nodes[parent].children.retain(|&child| child != key);
        }

        let mut removed = Vec::with_capacity(subtree.len());
        for node_key in subtree {
            if let Some(node) = self.nodes.remove(node_key) {
                let unmapped = self.lookup.remove(&node.entity);
                debug_assert_eq!(unmapped, Some(node_key), "lookup out of sync for {}", node.entity.name());
                removed.push(node.entity);
            }
        }
        debug_assert_eq!(removed.first(), Some(entity));
        debug_assert_eq!(self.lookup.len(), self.nodes.len());

        log::debug!("Removed {} ({} entities)", entity.name(), removed.len());
        Ok(removed)
    }

    /// Remove every descendant of `entity`, keeping `entity` itself
    ///
    /// Returns the number of entities removed.
    pub fn clear_children(&mut self, entity: &EntityHandle) -> Result<usize> {
        let key = self.key_of(entity)?;

        let subtree = self.breadth_first_keys(key);
        for &node_key in &subtree[1..] {
            if let Some(node) = self.nodes.remove(node_key) {
                self.lookup.remove(&node.entity);
            }
        }
        self.nodes[key].children.clear();

        let removed = subtree.len() - 1;
        log::debug!("Cleared {} descendants of {}", removed, entity.name());
        Ok(removed)
    }

    /// Move `entity` (with its subtree) to the end of `new_parent`'s children
    ///
    /// The moved subtree's cached world transforms are invalidated.
    pub fn reparent(&mut self, entity: &EntityHandle, new_parent: &EntityHandle) -> Result<()> {
        let key = self.key_of(entity)?;
        if key == self.root {
            return Err(SceneGraphError::RootReparent);
        }
        let parent_key = self.key_of(new_parent)?;
        if self.is_ancestor_or_self(key, parent_key) {
            return Err(SceneGraphError::CycleDetected(entity.name()));
        }

        if let Some(old_parent) = self.nodes[key].parent {
            self.nodes[old_parent].children.retain(|&child| child != key);
        }
        self.nodes[key].parent = Some(parent_key);
        self.nodes[parent_key].children.push(key);
        self.invalidate_subtree(key);

        log::debug!("Reparented {} under {}", entity.name(), new_parent.name());
        Ok(())
    }

    /// First entity matching `predicate`, scanning in unspecified order
    pub fn find<P>(&self, mut predicate: P) -> Option<EntityHandle>
    where
        P: FnMut(&EntityHandle) -> bool,
    {
        self.lookup.keys().find(|entity| predicate(entity)).cloned()
    }

    /// First entity whose name is `name`
    pub fn find_by_name(&self, name: &str) -> Option<EntityHandle> {
        self.find(|entity| entity.name() == name)
    }

    /// World transform of `entity`, computing and caching it if stale
    pub fn world_transform(&mut self, entity: &EntityHandle) -> Result<Mat4> {
        let key = self.key_of(entity)?;
        Ok(self.resolve_world(key))
    }

    /// Recompute and cache the world transform of `entity` from its local transform
    ///
    /// Ancestors are resolved lazily. If the result differs from the cached
    /// value, the entity's descendants are invalidated.
    pub fn recalculate_world_transform(&mut self, entity: &EntityHandle) -> Result<Mat4> {
        let key = self.key_of(entity)?;
        let parent = self.nodes[key].parent;
        let parent_world = parent.map(|parent| self.resolve_world(parent));
        let world = self.compose(parent_world.as_ref(), key);

        let previous = self.nodes[key].world_transform.replace(world);
        if previous.is_some_and(|previous| previous != world) {
            let children = self.nodes[key].children.clone();
            for child in children {
                self.invalidate_subtree(child);
            }
        }

        log::trace!("Recalculated world transform of {}", entity.name());
        Ok(world)
    }

    /// Eagerly recompute every world transform in a subtree
    ///
    /// Starts at `entity`, or at the root when `None`. Parents are visited
    /// before their children, so each node composes with a fresh parent value.
    pub fn recalculate_world_transforms(&mut self, entity: Option<&EntityHandle>) -> Result<()> {
        let start = match entity {
            Some(entity) => self.key_of(entity)?,
            None => self.root,
        };

        let order = self.breadth_first_keys(start);
        let start_parent = self.nodes[start].parent;
        let mut parent_world = start_parent.map(|parent| self.resolve_world(parent));
        for &key in &order {
            if key != start {
                parent_world = self.nodes[key]
                    .parent
                    .and_then(|parent| self.nodes[parent].world_transform);
            }
            let world = self.compose(parent_world.as_ref(), key);
            self.nodes[key].world_transform = Some(world);
        }

        log::trace!("Recalculated {} world transforms", order.len());
        Ok(())
    }

    /// Parent placement combined with only the scale of `entity`'s local transform
    ///
    /// Yields `without_scale(world(parent)) * scale(local)`, or just the local
    /// scale for the root. The cache is left untouched.
    pub fn world_transform_with_local_transform(&self, entity: &EntityHandle) -> Result<Mat4> {
        let key = self.key_of(entity)?;
        let node = &self.nodes[key];
        let scale = math::scale_part(&node.local_transform());

        Ok(match node.parent {
            Some(parent) => math::without_scale(&self.peek_world(parent)) * scale,
            None => scale,
        })
    }

    /// Mark the cached world transform of `entity` and its subtree as stale
    ///
    /// Entities outside the graph are ignored, as are entities whose cache is
    /// already stale.
    pub fn invalidate_world_transform(&mut self, entity: &EntityHandle) {
        match self.lookup.get(entity) {
            Some(&key) => self.invalidate_subtree(key),
            None => log::trace!("Ignoring invalidation of {} (not in scene graph)", entity.name()),
        }
    }

    /// Tell the graph that `entity`'s local transform has changed
    pub fn notify_transform_changed(&mut self, entity: &EntityHandle) {
        self.invalidate_world_transform(entity);
    }

    /// Whether `entity` currently has a cached world transform
    pub fn is_world_transform_cached(&self, entity: &EntityHandle) -> bool {
        self.lookup
            .get(entity)
            .is_some_and(|&key| self.nodes[key].world_transform.is_some())
    }

    /// Call [`Loadable::load_content`](super::Loadable::load_content) on every loadable entity
    pub fn load_content(&self) {
        let mut loaded = 0usize;
        for key in self.breadth_first_keys(self.root) {
            let mut entity = self.nodes[key].entity.borrow_mut();
            if let Some(loadable) = entity.loadable() {
                loadable.load_content();
                loaded += 1;
            }
        }
        log::debug!("Loaded content for {} entities", loaded);
    }

    /// Draw every drawable entity with its world transform
    pub fn draw(&mut self, view: &Mat4, projection: &Mat4) {
        for key in self.breadth_first_keys(self.root) {
            let entity = self.nodes[key].entity.clone();
            if entity.borrow_mut().drawable().is_none() {
                continue;
            }

            let world = self.resolve_world(key);
            let mut borrowed = entity.borrow_mut();
            if let Some(drawable) = borrowed.drawable() {
                drawable.draw(view, projection, &world);
            }
        }
    }

    /// Clear the selection flag of every selectable entity
    pub fn deselect_all(&self) {
        for key in self.breadth_first_keys(self.root) {
            let mut entity = self.nodes[key].entity.borrow_mut();
            if let Some(selectable) = entity.selectable() {
                selectable.set_selected(false);
            }
        }
    }

    /// Closest selectable entity hit by `ray`
    pub fn select(&mut self, ray: &Ray) -> Option<EntityHandle> {
        self.select_hit(ray).map(|hit| hit.entity)
    }

    /// Closest selectable entity hit by `ray`, with its hit distance
    ///
    /// Equal distances resolve to the entity visited first. Hits beyond
    /// [`SceneGraphConfig::max_pick_distance`] are ignored.
    pub fn select_hit(&mut self, ray: &Ray) -> Option<PickHit> {
        let mut closest: Option<PickHit> = None;

        for key in self.breadth_first_keys(self.root) {
            let entity = self.nodes[key].entity.clone();
            if entity.borrow_mut().selectable().is_none() {
                continue;
            }

            let world = self.resolve_world(key);
            let Some(distance) = entity
                .borrow_mut()
                .selectable()
                .and_then(|selectable| selectable.intersects(ray, &world))
            else {
                continue;
            };

            if !distance.is_finite() {
                log::warn!("Ignoring non-finite hit distance reported by {}", entity.name());
                continue;
            }
            if self.config.max_pick_distance.is_some_and(|max| distance > max) {
                log::trace!("Ignoring hit on {} at {} (beyond pick range)", entity.name(), distance);
                continue;
            }
            if closest.as_ref().map_or(true, |hit| distance < hit.distance) {
                closest = Some(PickHit { entity, distance });
            }
        }

        closest
    }

    /// Every entity in breadth-first order, starting at the root
    pub fn entities_breadth_first(&self) -> Vec<EntityHandle> {
        self.entities_from(self.root)
    }

    /// Every entity in the subtree rooted at `entity`, in breadth-first order
    pub fn entities_breadth_first_from(&self, entity: &EntityHandle) -> Result<Vec<EntityHandle>> {
        let key = self.key_of(entity)?;
        Ok(self.entities_from(key))
    }

    fn entities_from(&self, start: NodeKey) -> Vec<EntityHandle> {
        self.breadth_first_keys(start)
            .into_iter()
            .map(|key| self.nodes[key].entity.clone())
            .collect()
    }

    fn key_of(&self, entity: &EntityHandle) -> Result<NodeKey> {
        self.lookup
            .get(entity)
            .copied()
            .ok_or_else(|| SceneGraphError::NotFound(entity.name()))
    }

    /// Keys of the subtree rooted at `start`, level by level
    fn breadth_first_keys(&self, start: NodeKey) -> Vec<NodeKey> {
        let mut order = vec![start];
        let mut cursor = 0;
        while cursor < order.len() {
            let key = order[cursor];
            cursor += 1;
            order.extend_from_slice(&self.nodes[key].children);
        }
        order
    }

    fn is_ancestor_or_self(&self, ancestor: NodeKey, mut node: NodeKey) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn compose(&self, parent_world: Option<&Mat4>, key: NodeKey) -> Mat4 {
        let local = self.nodes[key].local_transform();
        parent_world.map_or(local, |parent| math::without_scale(parent) * local)
    }

    /// Stale nodes from `key` up to (excluding) the nearest cached ancestor,
    /// nearest first, together with that ancestor's world transform.
    fn stale_chain(&self, key: NodeKey) -> (Vec<NodeKey>, Option<Mat4>) {
        let mut chain = Vec::new();
        let mut cursor = Some(key);
        while let Some(current) = cursor {
            let node = &self.nodes[current];
            if let Some(world) = node.world_transform {
                return (chain, Some(world));
            }
            chain.push(current);
            cursor = node.parent;
        }
        (chain, None)
    }

    fn resolve_world(&mut self, key: NodeKey) -> Mat4 {
        let (chain, mut world) = self.stale_chain(key);
        for &stale in chain.iter().rev() {
            let composed = self.compose(world.as_ref(), stale);
            self.nodes[stale].world_transform = Some(composed);
            world = Some(composed);
        }

        if !chain.is_empty() {
            log::trace!("Resolved {} stale world transforms", chain.len());
        }
        world.unwrap_or_else(|| self.nodes[key].local_transform())
    }

    /// Same result as `resolve_world`, without writing to the cache
    fn peek_world(&self, key: NodeKey) -> Mat4 {
        let (chain, mut world) = self.stale_chain(key);
        for &stale in chain.iter().rev() {
            world = Some(self.compose(world.as_ref(), stale));
        }
        world.unwrap_or_else(|| self.nodes[key].local_transform())
    }

    fn invalidate_subtree(&mut self, key: NodeKey) {
        if self.nodes[key].world_transform.is_none() {
            return;
        }

        let mut pending = vec![key];
        let mut cursor = 0;
        let mut cleared = 0usize;
        while cursor < pending.len() {
            let current = pending[cursor];
            cursor += 1;
            // A stale node has no cached descendants
            if self.nodes[current].world_transform.take().is_some() {
                cleared += 1;
                pending.extend_from_slice(&self.nodes[current].children);
            }
        }

        log::trace!("Invalidated {} cached world transforms", cleared);
    }
}
