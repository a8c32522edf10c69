//! Viewport sync
//!
//! After every player move: hide caches that fell out of view, then visit
//! every cell the view touches and spawn or reveal its cache. Both passes
//! are idempotent, so running a sync twice (or on a timer) is harmless.

use super::coin::CellRegistry;
use super::grid::{CellBounds, CellId, LatLng, cell_of};
use super::luck::Luck;
use super::registry::{CacheRegistry, SpawnOutcome};
use crate::platform::MapLayer;
use crate::settings::Settings;

/// Visible area around the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Geographic extent
    pub bounds: CellBounds,
    /// Cell holding the south-west corner (inclusive)
    pub min: CellId,
    /// Cell holding the north-east corner (inclusive)
    pub max: CellId,
}

impl Viewport {
    /// Square view reaching `neighborhood_size` tiles out from `center`
    pub fn around(center: LatLng, settings: &Settings) -> Self {
        let reach = settings.neighborhood_size as f64 * settings.tile_degrees;
        let bounds = CellBounds {
            south_west: center.offset(-reach, -reach),
            north_east: center.offset(reach, reach),
        };
        Self {
            bounds,
            min: cell_of(bounds.south_west, settings.tile_degrees),
            max: cell_of(bounds.north_east, settings.tile_degrees),
        }
    }

    /// Whether a cell intersects the view
    pub fn contains_cell(&self, cell: CellId) -> bool {
        (self.min.i..=self.max.i).contains(&cell.i) && (self.min.j..=self.max.j).contains(&cell.j)
    }

    /// Every intersecting cell, row-major (latitude, then longitude).
    /// Both edges are inclusive so the boundary cells are never skipped.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + use<> {
        let (min, max) = (self.min, self.max);
        (min.i..=max.i).flat_map(move |i| (min.j..=max.j).map(move |j| CellId::new(i, j)))
    }

    pub fn cell_count(&self) -> usize {
        let span = |lo: i32, hi: i32| {
            usize::try_from((i64::from(hi) - i64::from(lo) + 1).max(0)).unwrap_or(usize::MAX)
        };
        span(self.min.i, self.max.i).saturating_mul(span(self.min.j, self.max.j))
    }
}

/// Counts from one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub spawned: usize,
    pub revealed: usize,
    pub hidden: usize,
}

impl SyncReport {
    /// Whether the pass generated any new cache
    pub fn changed_world(&self) -> bool {
        self.spawned > 0
    }
}

/// Reconcile cache visibility with the view around `center`
pub fn update_caches(
    registry: &mut CacheRegistry,
    cells: &mut CellRegistry,
    luck: &dyn Luck,
    settings: &Settings,
    map: &mut dyn MapLayer,
    center: LatLng,
) -> SyncReport {
    let view = Viewport::around(center, settings);
    let mut report = SyncReport::default();

    let stale: Vec<CellId> = registry
        .visible()
        .map(|c| c.id)
        .filter(|id| !view.contains_cell(*id))
        .collect();
    for cell in stale {
        if registry.hide(cell, map) {
            report.hidden += 1;
        }
    }

    for cell in view.cells() {
        match registry.spawn_or_reveal(cell, cells, luck, settings, map) {
            SpawnOutcome::Spawned => report.spawned += 1,
            SpawnOutcome::Revealed => report.revealed += 1,
            SpawnOutcome::AlreadyVisible | SpawnOutcome::Empty => {}
        }
    }

    log::debug!(
        "Viewport sync: {} spawned, {} revealed, {} hidden",
        report.spawned,
        report.revealed,
        report.hidden
    );
    report
}
