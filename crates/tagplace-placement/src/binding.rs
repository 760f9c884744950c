//! Static marker → entity bindings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tagplace_core::MarkerId;

/// Handle of a placeable entity owned by the host scene.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHandle(pub String);

impl EntityHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One configured binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub marker_id: MarkerId,
    pub entity: EntityHandle,
}

/// Binding table validation errors.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BindingError {
    #[error("marker {marker_id} is bound twice ({first} and {second})")]
    DuplicateMarker {
        marker_id: MarkerId,
        first: EntityHandle,
        second: EntityHandle,
    },
    #[error("entity name must not be empty (marker {marker_id})")]
    EmptyEntity { marker_id: MarkerId },
}

/// Read-only marker id → entity lookup, built once at initialization.
#[derive(Clone, Debug, Default)]
pub struct BindingTable {
    by_marker: BTreeMap<MarkerId, EntityHandle>,
}

impl BindingTable {
    /// Validate and build the table.
    pub fn new<I>(bindings: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = Binding>,
    {
        let mut by_marker: BTreeMap<MarkerId, EntityHandle> = BTreeMap::new();
        for Binding { marker_id, entity } in bindings {
            if entity.0.is_empty() {
                return Err(BindingError::EmptyEntity { marker_id });
            }
            if let Some(first) = by_marker.get(&marker_id) {
                return Err(BindingError::DuplicateMarker {
                    marker_id,
                    first: first.clone(),
                    second: entity,
                });
            }
            by_marker.insert(marker_id, entity);
        }
        Ok(Self { by_marker })
    }

    #[inline]
    pub fn bound_entity(&self, id: MarkerId) -> Option<&EntityHandle> {
        self.by_marker.get(&id)
    }

    /// Bindings in ascending marker id order.
    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &EntityHandle)> {
        self.by_marker.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn marker_ids(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.by_marker.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_marker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_marker.is_empty()
    }
}
