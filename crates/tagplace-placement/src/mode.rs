//! Which strategy drives entity transforms.

use serde::{Deserialize, Serialize};

/// Mode selectable independently of slow placing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseMode {
    /// Snap bound entities to this cycle's poses every frame.
    AutoPlace,
    /// Detection and smoothing only; callers query poses themselves.
    #[default]
    OnDemand,
}

/// The strategy currently driving entity transforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    AutoPlace,
    OnDemand,
    SlowPlacing,
}

impl From<BaseMode> for PlacementMode {
    fn from(mode: BaseMode) -> Self {
        match mode {
            BaseMode::AutoPlace => PlacementMode::AutoPlace,
            BaseMode::OnDemand => PlacementMode::OnDemand,
        }
    }
}

/// Resolves toggles into exactly one driving mode.
///
/// Slow placing overrides the base mode while enabled. Enabling it forces the
/// base mode to [`BaseMode::OnDemand`], so auto placement stays off after slow
/// placing is disabled again unless it is explicitly re-selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeArbitrator {
    base: BaseMode,
    slow_placing: bool,
}

impl ModeArbitrator {
    pub fn new(initial: PlacementMode) -> Self {
        match initial {
            PlacementMode::AutoPlace => Self {
                base: BaseMode::AutoPlace,
                slow_placing: false,
            },
            PlacementMode::OnDemand => Self {
                base: BaseMode::OnDemand,
                slow_placing: false,
            },
            PlacementMode::SlowPlacing => Self {
                base: BaseMode::OnDemand,
                slow_placing: true,
            },
        }
    }

    #[inline]
    pub fn mode(&self) -> PlacementMode {
        if self.slow_placing {
            PlacementMode::SlowPlacing
        } else {
            self.base.into()
        }
    }

    #[inline]
    pub fn base(&self) -> BaseMode {
        self.base
    }

    #[inline]
    pub fn is_auto_place_enabled(&self) -> bool {
        self.mode() == PlacementMode::AutoPlace
    }

    #[inline]
    pub fn is_slow_placing(&self) -> bool {
        self.slow_placing
    }

    /// Select the base mode.
    ///
    /// While slow placing is enabled the selection is stored but does not
    /// take over until slow placing is disabled.
    pub fn select(&mut self, base: BaseMode) {
        if self.slow_placing && base == BaseMode::AutoPlace {
            log::warn!("auto place selected while slow placing is enabled; deferred");
        }
        if self.base != base {
            log::info!("base placement mode {:?} -> {:?}", self.base, base);
        }
        self.base = base;
    }

    /// Enable slow placing. Returns `true` on an actual transition.
    pub fn enable_slow_placing(&mut self) -> bool {
        if self.slow_placing {
            return false;
        }
        if self.base == BaseMode::AutoPlace {
            log::info!("slow placing enabled: auto place forced off");
        }
        self.base = BaseMode::OnDemand;
        self.slow_placing = true;
        true
    }

    /// Disable slow placing. Returns `true` on an actual transition.
    pub fn disable_slow_placing(&mut self) -> bool {
        let was = self.slow_placing;
        self.slow_placing = false;
        was
    }
}

impl Default for ModeArbitrator {
    fn default() -> Self {
        Self::new(PlacementMode::OnDemand)
    }
}
