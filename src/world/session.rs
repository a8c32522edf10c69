//! Game session aggregate
//!
//! One `GameSession` holds everything that changes during play: the player,
//! the cell flyweight, the cache registry and the tracking state. The driver
//! owns it and threads collaborators (map layer) through each call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cache::Cache;
use super::coin::CellRegistry;
use super::grid::{CellId, LatLng, cell_of};
use super::luck::{HashLuck, Luck};
use super::registry::{CacheRegistry, SpawnOutcome};
use super::viewport::{SyncReport, update_caches};
use crate::persistence::memento::{CacheMemento, PersistedSnapshot, SNAPSHOT_VERSION};
use crate::persistence::PersistenceError;
use crate::platform::MapLayer;
use crate::settings::Settings;

/// One-tile movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// (d_lat, d_lng) for a step of one tile
    pub fn delta(self, tile: f64) -> (f64, f64) {
        match self {
            Direction::North => (tile, 0.0),
            Direction::South => (-tile, 0.0),
            Direction::East => (0.0, tile),
            Direction::West => (0.0, -tile),
        }
    }
}

/// Player position, coins in hand and where they have been
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: LatLng,
    pub points: u32,
    /// Every position visited, oldest first
    pub trail: Vec<LatLng>,
}

impl PlayerState {
    pub fn at(position: LatLng) -> Self {
        Self {
            position,
            points: 0,
            trail: vec![position],
        }
    }
}

/// Result of a collect or deposit that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// One coin changed hands
    Moved { cache_value: u32, player_points: u32 },
    /// Nothing to do (unknown cache, or cache already empty)
    Ignored,
}

/// User-visible command failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("You don't have any coins to deposit.")]
    NothingToDeposit,
}

/// Proof of an active tracking subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingToken {
    generation: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tracking {
    active: bool,
    generation: u64,
}

/// Complete mutable game state
pub struct GameSession {
    player: PlayerState,
    cells: CellRegistry,
    caches: CacheRegistry,
    settings: Settings,
    luck: Box<dyn Luck>,
    tracking: Tracking,
    /// Set when state worth saving changed
    dirty: bool,
}

impl GameSession {
    /// Fresh session at the configured origin
    pub fn new(settings: Settings, luck: Box<dyn Luck>) -> Self {
        let settings = settings.sanitized();
        Self {
            player: PlayerState::at(settings.origin),
            cells: CellRegistry::new(),
            caches: CacheRegistry::new(),
            settings,
            luck,
            tracking: Tracking::default(),
            dirty: false,
        }
    }

    /// Fresh session using the default hash-based luck
    pub fn with_settings(settings: Settings) -> Self {
        Self::new(settings, Box::new(HashLuck))
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    pub fn cells(&self) -> &CellRegistry {
        &self.cells
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self, cell: CellId) -> Option<&Cache> {
        self.caches.get(cell)
    }

    /// Player coins plus every cache's coins
    pub fn total_coins(&self) -> u64 {
        self.player.points as u64 + self.caches.total_coins()
    }

    /// Returns whether anything worth saving changed, and clears the flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Resync cache visibility with the player's current position
    pub fn update_caches(&mut self, map: &mut dyn MapLayer) -> SyncReport {
        let report = update_caches(
            &mut self.caches,
            &mut self.cells,
            self.luck.as_ref(),
            &self.settings,
            map,
            self.player.position,
        );
        if report.changed_world() {
            self.dirty = true;
        }
        report
    }

    /// Spawn or reveal the cache of the cell containing `position`
    pub fn spawn_or_reveal_at(&mut self, position: LatLng, map: &mut dyn MapLayer) -> SpawnOutcome {
        let cell = cell_of(position, self.settings.tile_degrees);
        let outcome = self.caches.spawn_or_reveal(
            cell,
            &mut self.cells,
            self.luck.as_ref(),
            &self.settings,
            map,
        );
        if outcome == SpawnOutcome::Spawned {
            self.dirty = true;
        }
        outcome
    }

    /// Step one tile and resync
    pub fn move_player(&mut self, direction: Direction, map: &mut dyn MapLayer) -> SyncReport {
        let (d_lat, d_lng) = direction.delta(self.settings.tile_degrees);
        let target = self.player.position.offset(d_lat, d_lng);
        self.teleport(target, map)
    }

    /// Jump to an arbitrary position (trail records it) and resync.
    /// Positions off the globe are dropped.
    pub fn teleport(&mut self, position: LatLng, map: &mut dyn MapLayer) -> SyncReport {
        if !position.is_on_globe() {
            log::warn!("Ignoring position off the globe: {:?}", position);
            return SyncReport::default();
        }
        self.player.position = position;
        self.player.trail.push(position);
        self.dirty = true;
        self.update_caches(map)
    }

    /// Take one coin from a cache
    pub fn apply_collect(
        &mut self,
        cell: CellId,
        map: &mut dyn MapLayer,
    ) -> Result<Transfer, CommandError> {
        let Some(cache) = self.caches.get_mut(cell) else {
            return Ok(Transfer::Ignored);
        };
        if cache.coin_value == 0 {
            return Ok(Transfer::Ignored);
        }
        let Some(points) = self.player.points.checked_add(1) else {
            log::warn!("Player purse is full");
            return Ok(Transfer::Ignored);
        };
        cache.coin_value -= 1;
        self.player.points = points;
        let cache_value = cache.coin_value;

        self.caches.refresh_popup(cell, map);
        self.dirty = true;
        Ok(Transfer::Moved {
            cache_value,
            player_points: self.player.points,
        })
    }

    /// Put one coin into a cache
    pub fn apply_deposit(
        &mut self,
        cell: CellId,
        map: &mut dyn MapLayer,
    ) -> Result<Transfer, CommandError> {
        let Some(cache) = self.caches.get_mut(cell) else {
            return Ok(Transfer::Ignored);
        };
        if self.player.points == 0 {
            return Err(CommandError::NothingToDeposit);
        }
        let Some(value) = cache.coin_value.checked_add(1) else {
            log::warn!("Cache {} is full", cell);
            return Ok(Transfer::Ignored);
        };
        cache.coin_value = value;
        self.player.points -= 1;
        let cache_value = cache.coin_value;

        self.caches.refresh_popup(cell, map);
        self.dirty = true;
        Ok(Transfer::Moved {
            cache_value,
            player_points: self.player.points,
        })
    }

    /// Begin accepting sensor fixes. Restarting invalidates older tokens.
    pub fn start_tracking(&mut self) -> TrackingToken {
        self.tracking.generation += 1;
        self.tracking.active = true;
        log::info!("Tracking started (generation {})", self.tracking.generation);
        TrackingToken {
            generation: self.tracking.generation,
        }
    }

    /// Stop accepting sensor fixes; fixes already applied stay applied
    pub fn stop_tracking(&mut self) {
        if self.tracking.active {
            self.tracking.active = false;
            self.tracking.generation += 1;
            log::info!("Tracking stopped");
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking.active
    }

    /// Apply a location fix. Returns `None` if the subscription behind
    /// `token` is no longer live.
    pub fn apply_sensor_fix(
        &mut self,
        token: TrackingToken,
        position: LatLng,
        map: &mut dyn MapLayer,
    ) -> Option<SyncReport> {
        if !self.tracking.active || token.generation != self.tracking.generation {
            log::warn!("Dropping stale location fix");
            return None;
        }
        Some(self.teleport(position, map))
    }

    /// Start over at the origin: caches and trail are discarded and
    /// outstanding tracking tokens die. Cell counters live on, so the new
    /// world mints coins the old one never used.
    pub fn reset(&mut self, map: &mut dyn MapLayer) -> SyncReport {
        self.caches.drain(map);
        self.player = PlayerState::at(self.settings.origin);
        self.stop_tracking();
        self.dirty = false;
        self.update_caches(map)
    }

    /// Capture player state and every cache (hidden ones included)
    pub fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            version: SNAPSHOT_VERSION,
            player_position: self.player.position,
            player_points: self.player.points,
            movement_history: self.player.trail.iter().map(|p| (*p).into()).collect(),
            caches: self.caches.iter().map(CacheMemento::from).collect(),
        }
    }

    /// Replace session state with a snapshot, then resync visibility against
    /// the restored position.
    ///
    /// The snapshot is validated first; on error nothing has changed.
    /// Caches missing from the snapshot are dropped. Cell counters only move
    /// forward, so restored coins are never minted again.
    pub fn restore(
        &mut self,
        snapshot: PersistedSnapshot,
        map: &mut dyn MapLayer,
    ) -> Result<SyncReport, PersistenceError> {
        snapshot.validate()?;
        snapshot.check_grid(self.settings.tile_degrees)?;

        let mut previous = self.caches.drain(map);
        self.player = PlayerState {
            position: snapshot.player_position,
            points: snapshot.player_points,
            trail: snapshot.movement_history.into_iter().map(LatLng::from).collect(),
        };

        for memento in snapshot.caches {
            for coin in &memento.coin_ids {
                self.cells.reserve(*coin);
            }
            let cache = match previous.remove(&memento.id) {
                Some(mut existing) => {
                    existing.coin_value = memento.coin_value;
                    existing.coin_ids = memento.coin_ids;
                    existing
                }
                None => Cache::from(memento),
            };
            self.caches.insert(cache);
        }

        self.dirty = false;
        Ok(self.update_caches(map))
    }
}
