//! Gameplay settings
//!
//! Persisted separately from game saves in the key-value store.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::persistence::KeyValueStore;
use crate::world::LatLng;

/// World generation and session tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cell edge length in degrees
    pub tile_degrees: f64,
    /// Cells visible on each side of the player
    pub neighborhood_size: u32,
    /// Chance a cell holds a cache (0.0 - 1.0)
    pub spawn_probability: f64,
    /// Upper bound (exclusive) on a new cache's coin count
    pub initial_value_scale: u32,
    /// Where new games start
    pub origin: LatLng,
    /// Save after every state-changing event
    pub autosave: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tile_degrees: TILE_DEGREES,
            neighborhood_size: NEIGHBORHOOD_SIZE,
            spawn_probability: CACHE_SPAWN_PROBABILITY,
            initial_value_scale: INITIAL_VALUE_SCALE,
            origin: LatLng::new(ORIGIN_LAT, ORIGIN_LNG),
            autosave: true,
        }
    }
}

impl Settings {
    /// Replace values that would break the grid with defaults, and clamp
    /// sizes to what a browser can walk every sync
    pub fn sanitized(mut self) -> Self {
        if !(self.tile_degrees.is_finite() && self.tile_degrees > 0.0) {
            log::warn!("Invalid tile size {}, using default", self.tile_degrees);
            self.tile_degrees = TILE_DEGREES;
        }
        self.tile_degrees = self.tile_degrees.clamp(MIN_TILE_DEGREES, MAX_TILE_DEGREES);
        if self.neighborhood_size > MAX_NEIGHBORHOOD_SIZE {
            log::warn!("Neighborhood size {} too large", self.neighborhood_size);
            self.neighborhood_size = MAX_NEIGHBORHOOD_SIZE;
        }
        if self.initial_value_scale > MAX_INITIAL_VALUE_SCALE {
            log::warn!("Initial value scale {} too large", self.initial_value_scale);
            self.initial_value_scale = MAX_INITIAL_VALUE_SCALE;
        }
        if self.spawn_probability.is_nan() {
            self.spawn_probability = CACHE_SPAWN_PROBABILITY;
        }
        self.spawn_probability = self.spawn_probability.clamp(0.0, 1.0);
        if !self.origin.is_on_globe() {
            self.origin = LatLng::new(ORIGIN_LAT, ORIGIN_LNG);
        }
        self
    }

    /// Load settings from the store, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        if let Some(json) = store.get(SETTINGS_KEY) {
            match serde_json::from_str::<Settings>(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    return settings.sanitized();
                }
                Err(e) => log::warn!("Ignoring unreadable settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to the store
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(self) {
            Ok(json) => match store.set(SETTINGS_KEY, &json) {
                Ok(()) => log::info!("Settings saved"),
                Err(e) => log::warn!("Settings not saved: {}", e),
            },
            Err(e) => log::warn!("Settings not serialized: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_settings_roundtrip_through_store() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            neighborhood_size: 3,
            spawn_probability: 0.5,
            ..Default::default()
        };
        settings.save(&mut store);
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_missing_settings_use_defaults() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, r#"{"neighborhood_size": 2}"#).unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.neighborhood_size, 2);
        assert_eq!(settings.tile_degrees, TILE_DEGREES);
    }

    #[test]
    fn test_oversized_settings_are_clamped() {
        let mut store = MemoryStore::new();
        store
            .set(
                SETTINGS_KEY,
                r#"{"neighborhood_size": 4000000000, "initial_value_scale": 4000000000,
                    "tile_degrees": 1e-300, "origin": {"lat": 1000.0, "lng": 0.0}}"#,
            )
            .unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.neighborhood_size, MAX_NEIGHBORHOOD_SIZE);
        assert_eq!(settings.initial_value_scale, MAX_INITIAL_VALUE_SCALE);
        assert_eq!(settings.tile_degrees, MIN_TILE_DEGREES);
        assert_eq!(settings.origin, Settings::default().origin);
    }

    #[test]
    fn test_corrupt_settings_use_defaults() {
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, "{not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_sanitized_clamps_bad_values() {
        let settings = Settings {
            tile_degrees: -1.0,
            spawn_probability: 4.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.tile_degrees, TILE_DEGREES);
        assert_eq!(settings.spawn_probability, 1.0);
    }
}
