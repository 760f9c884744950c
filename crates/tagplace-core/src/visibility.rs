use std::collections::HashSet;

use crate::MarkerId;

/// Set of marker ids seen in the most recent detection cycle.
///
/// Absence is the "not visible" representation: every cycle replaces the
/// whole set, it is never merged with the previous one.
#[derive(Clone, Debug, Default)]
pub struct VisibilityTable {
    visible: HashSet<MarkerId>,
    cycles: u64,
}

impl VisibilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with exactly the ids of this cycle.
    pub fn record_cycle<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = MarkerId>,
    {
        self.visible = ids.into_iter().collect();
        self.cycles += 1;
    }

    #[inline]
    pub fn is_visible(&self, id: MarkerId) -> bool {
        self.visible.contains(&id)
    }

    /// Visible ids in ascending order.
    pub fn visible_ids(&self) -> Vec<MarkerId> {
        let mut ids: Vec<MarkerId> = self.visible.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of cycles recorded since creation or the last clear.
    #[inline]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn clear(&mut self) {
        self.visible.clear();
        self.cycles = 0;
    }
}
