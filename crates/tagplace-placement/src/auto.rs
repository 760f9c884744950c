//! One auto-placement pass over the binding table.

use std::collections::{BTreeSet, HashMap};

use tagplace_core::{MarkerId, MarkerPose};

use crate::{BindingTable, EntityStore};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What a placement pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacementOutcome {
    /// Every requested marker was detected this cycle.
    ///
    /// Requested markers are the allowlist when one is given, otherwise all
    /// bound markers. An empty request is trivially satisfied.
    pub all_found: bool,
    /// Markers whose entity was activated and snapped, ascending.
    pub placed: Vec<MarkerId>,
    /// Markers whose entity was deactivated, ascending.
    pub deactivated: Vec<MarkerId>,
}

/// Snap every allowed, detected bound entity to its marker pose.
///
/// Bound markers that are excluded by `included`, or included but not
/// detected, are deactivated when `deactivate_unfound` is set and left
/// untouched otherwise. Detections without a binding are ignored.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(poses, bindings, store), fields(detected = poses.len()))
)]
pub fn place_entities<S>(
    poses: &HashMap<MarkerId, MarkerPose>,
    bindings: &BindingTable,
    included: Option<&BTreeSet<MarkerId>>,
    deactivate_unfound: bool,
    store: &mut S,
) -> PlacementOutcome
where
    S: EntityStore + ?Sized,
{
    let mut outcome = PlacementOutcome::default();
    let allowed = |id: MarkerId| included.is_none_or(|set| set.contains(&id));

    for (id, entity) in bindings.iter() {
        match poses.get(&id) {
            Some(pose) if allowed(id) => {
                store.set_active(entity, true);
                store.set_pose(entity, pose.pose());
                outcome.placed.push(id);
            }
            _ => {
                if deactivate_unfound {
                    store.set_active(entity, false);
                    outcome.deactivated.push(id);
                }
            }
        }
    }

    outcome.all_found = match included {
        Some(set) => set.iter().all(|id| poses.contains_key(id)),
        None => bindings.marker_ids().all(|id| poses.contains_key(&id)),
    };

    log::trace!(
        "auto place: placed={:?} deactivated={:?} all_found={}",
        outcome.placed,
        outcome.deactivated,
        outcome.all_found
    );
    outcome
}
