//! Cache registry
//!
//! Every cache generated this session, keyed by cell. Caches are never
//! dropped by movement: leaving the viewport hides them, coming back reveals
//! the same object with whatever coins it holds now.

use std::collections::BTreeMap;

use super::cache::{Cache, generate_cache, should_spawn};
use super::coin::CellRegistry;
use super::grid::CellId;
use super::luck::Luck;
use crate::platform::{CachePopup, MapLayer};
use crate::settings::Settings;

/// What `spawn_or_reveal` did for a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// New cache generated and shown
    Spawned,
    /// Existing hidden cache shown again
    Revealed,
    /// Cache already on the map
    AlreadyVisible,
    /// Spawn predicate says this cell is empty
    Empty,
}

/// All caches, ordered by cell id
#[derive(Debug, Clone, Default)]
pub struct CacheRegistry {
    caches: BTreeMap<CellId, Cache>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: CellId) -> Option<&Cache> {
        self.caches.get(&cell)
    }

    pub fn get_mut(&mut self, cell: CellId) -> Option<&mut Cache> {
        self.caches.get_mut(&cell)
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.caches.contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Caches in cell order
    pub fn iter(&self) -> impl Iterator<Item = &Cache> {
        self.caches.values()
    }

    /// Caches currently on the map
    pub fn visible(&self) -> impl Iterator<Item = &Cache> {
        self.caches.values().filter(|c| c.visible)
    }

    /// Coins held across every cache
    pub fn total_coins(&self) -> u64 {
        self.caches.values().map(|c| c.coin_value as u64).sum()
    }

    /// Return the cache for `cell`, generating it first if it does not exist.
    ///
    /// An existing cache is returned untouched; nothing is re-minted.
    pub fn create_cache(
        &mut self,
        cell: CellId,
        cells: &mut CellRegistry,
        luck: &dyn Luck,
        settings: &Settings,
    ) -> &mut Cache {
        self.caches.entry(cell).or_insert_with(|| {
            log::debug!("Generating cache {}", cell);
            generate_cache(cells, luck, settings, cell)
        })
    }

    /// Make sure the cell's cache (if it has one) is on the map.
    ///
    /// Safe to call any number of times: a visible cache is left alone and
    /// a cache is only ever generated once.
    pub fn spawn_or_reveal(
        &mut self,
        cell: CellId,
        cells: &mut CellRegistry,
        luck: &dyn Luck,
        settings: &Settings,
        map: &mut dyn MapLayer,
    ) -> SpawnOutcome {
        if let Some(cache) = self.caches.get_mut(&cell) {
            if cache.visible {
                return SpawnOutcome::AlreadyVisible;
            }
            show(cache, settings.tile_degrees, map);
            log::debug!("Revealed cache {} ({} coins)", cell, cache.coin_value);
            return SpawnOutcome::Revealed;
        }

        if !should_spawn(luck, cell, settings.spawn_probability) {
            return SpawnOutcome::Empty;
        }

        let cache = self.create_cache(cell, cells, luck, settings);
        show(cache, settings.tile_degrees, map);
        log::debug!("Spawned cache {} ({} coins)", cell, cache.coin_value);
        SpawnOutcome::Spawned
    }

    /// Show a known hidden cache. Returns false if unknown or already visible.
    pub fn reveal(&mut self, cell: CellId, tile: f64, map: &mut dyn MapLayer) -> bool {
        match self.caches.get_mut(&cell) {
            Some(cache) if !cache.visible => {
                show(cache, tile, map);
                true
            }
            _ => false,
        }
    }

    /// Take a cache off the map, keeping its state. Returns false if unknown
    /// or already hidden.
    pub fn hide(&mut self, cell: CellId, map: &mut dyn MapLayer) -> bool {
        match self.caches.get_mut(&cell) {
            Some(cache) if cache.visible => {
                if let Some(handle) = cache.layer.take() {
                    map.remove_layer(handle);
                }
                cache.visible = false;
                log::debug!("Hid cache {}", cell);
                true
            }
            _ => false,
        }
    }

    /// Push the cache's current value to its popup
    pub fn refresh_popup(&self, cell: CellId, map: &mut dyn MapLayer) {
        if let Some(cache) = self.caches.get(&cell) {
            if let Some(handle) = cache.layer {
                map.attach_popup(handle, popup_for(cache));
            }
        }
    }

    /// Hide everything and hand back the caches, leaving the registry empty
    pub fn drain(&mut self, map: &mut dyn MapLayer) -> BTreeMap<CellId, Cache> {
        let ids: Vec<CellId> = self.caches.keys().copied().collect();
        for cell in ids {
            self.hide(cell, map);
        }
        std::mem::take(&mut self.caches)
    }

    /// Register a cache built elsewhere (restore path). Replaces any cache
    /// already stored for that cell.
    pub fn insert(&mut self, cache: Cache) {
        self.caches.insert(cache.id, cache);
    }
}

fn popup_for(cache: &Cache) -> CachePopup {
    CachePopup {
        cell: cache.id,
        coin_value: cache.coin_value,
    }
}

fn show(cache: &mut Cache, tile: f64, map: &mut dyn MapLayer) {
    let handle = map.add_rectangle(cache.id.bounds(tile));
    map.attach_popup(handle, popup_for(cache));
    cache.layer = Some(handle);
    cache.visible = true;
}
