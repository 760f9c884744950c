//! Entity writes performed by the placement strategies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tagplace_core::Pose;

use crate::EntityHandle;

/// Host scene capability: activate, deactivate and move entities.
///
/// Handles come from the binding table; implementations decide what an
/// unknown handle means (the in-memory [`SceneEntities`] creates it).
pub trait EntityStore {
    fn set_active(&mut self, entity: &EntityHandle, active: bool);

    fn is_active(&self, entity: &EntityHandle) -> bool;

    fn pose(&self, entity: &EntityHandle) -> Option<Pose>;

    fn set_pose(&mut self, entity: &EntityHandle, pose: Pose);
}

/// State of one entity in [`SceneEntities`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub active: bool,
    pub pose: Pose,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            active: true,
            pose: Pose::identity(),
        }
    }
}

/// In-memory scene used by replays, tools and tests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneEntities {
    entities: BTreeMap<EntityHandle, EntityState>,
}

impl SceneEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity in its initial state, replacing any previous one.
    pub fn spawn(&mut self, entity: EntityHandle, state: EntityState) {
        self.entities.insert(entity, state);
    }

    pub fn get(&self, entity: &EntityHandle) -> Option<&EntityState> {
        self.entities.get(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityHandle, &EntityState)> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityStore for SceneEntities {
    fn set_active(&mut self, entity: &EntityHandle, active: bool) {
        self.entities.entry(entity.clone()).or_default().active = active;
    }

    fn is_active(&self, entity: &EntityHandle) -> bool {
        self.entities.get(entity).is_some_and(|e| e.active)
    }

    fn pose(&self, entity: &EntityHandle) -> Option<Pose> {
        self.entities.get(entity).map(|e| e.pose)
    }

    fn set_pose(&mut self, entity: &EntityHandle, pose: Pose) {
        self.entities.entry(entity.clone()).or_default().pose = pose;
    }
}
