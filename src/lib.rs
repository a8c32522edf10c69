//! Geocoin - A geolocation coin-cache treasure hunt
//!
//! Core modules:
//! - `world`: Deterministic world generation (grid, coins, caches, viewport, session)
//! - `persistence`: Save/load of the game memento through a key-value store
//! - `platform`: Map layer abstraction (rendering lives outside the core)
//! - `settings`: Data-driven gameplay tuning
//! - `game`: Top-level driver and event queue

pub mod game;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod world;

pub use game::{EventOutcome, Game, GameEvent};
pub use settings::Settings;
pub use world::{CellId, CoinId, Direction, GameSession, LatLng};

/// Game configuration constants
pub mod consts {
    /// Size of one grid cell in degrees (both latitude and longitude)
    pub const TILE_DEGREES: f64 = 0.0001;
    /// Cells visible in each direction from the player
    pub const NEIGHBORHOOD_SIZE: u32 = 8;
    /// Chance that any given cell holds a cache
    pub const CACHE_SPAWN_PROBABILITY: f64 = 0.1;
    /// Initial coin count is `floor(luck * scale)`
    pub const INITIAL_VALUE_SCALE: u32 = 100;

    /// Sanity limits for settings read from storage
    pub const MIN_TILE_DEGREES: f64 = 1e-7;
    pub const MAX_TILE_DEGREES: f64 = 1.0;
    pub const MAX_NEIGHBORHOOD_SIZE: u32 = 64;
    pub const MAX_INITIAL_VALUE_SCALE: u32 = 10_000;

    /// Starting point (Oakes College classroom)
    pub const ORIGIN_LAT: f64 = 36.98949379578401;
    pub const ORIGIN_LNG: f64 = -122.06277128548504;

    /// Store key for the game save
    pub const SAVE_KEY: &str = "geocoin_save";
    /// Store key for settings (kept apart from saves)
    pub const SETTINGS_KEY: &str = "geocoin_settings";
}
