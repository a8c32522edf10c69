//! Cache entity and deterministic generation
//!
//! Whether a cell holds a cache and how many coins it starts with are pure
//! functions of the cell coordinates. The two decisions draw from distinct
//! luck keys so spawn chance and value stay uncorrelated.

use super::coin::{CellRegistry, CoinId};
use super::grid::{CellId, LatLng};
use super::luck::Luck;
use crate::platform::LayerHandle;
use crate::settings::Settings;

/// Discriminator appended to the cell seed for the value roll
pub const INITIAL_VALUE_TAG: &str = "initialValue";

/// A coin container bound to exactly one cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cache {
    pub id: CellId,
    /// South-west corner of the cell
    pub anchor: LatLng,
    /// Coins currently held
    pub coin_value: u32,
    /// Provenance: every coin identity that contributed to this cache
    pub coin_ids: Vec<CoinId>,
    /// Currently shown on the map
    pub visible: bool,
    /// Map layer while visible
    pub layer: Option<LayerHandle>,
}

impl Cache {
    /// A hidden cache with the given contents
    pub fn new(id: CellId, anchor: LatLng, coin_value: u32, coin_ids: Vec<CoinId>) -> Self {
        Self {
            id,
            anchor,
            coin_value,
            coin_ids,
            visible: false,
            layer: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coin_value == 0
    }
}

/// Luck key for the value roll, `"{i},{j},initialValue"`
pub fn value_key(cell: CellId) -> String {
    format!("{},{}", cell.seed_key(), INITIAL_VALUE_TAG)
}

/// Spawn predicate: `luck("{i},{j}") < probability`
pub fn should_spawn(luck: &dyn Luck, cell: CellId, probability: f64) -> bool {
    luck.luck(&cell.seed_key()) < probability
}

/// Starting coin count: `floor(luck("{i},{j},initialValue") * scale)`
pub fn initial_coin_value(luck: &dyn Luck, cell: CellId, scale: u32) -> u32 {
    (luck.luck(&value_key(cell)) * scale as f64).floor() as u32
}

/// Build the cache for `cell`, minting its initial coins.
///
/// Does not consult the spawn predicate or any existing cache; the registry
/// owns both checks.
pub fn generate_cache(
    cells: &mut CellRegistry,
    luck: &dyn Luck,
    settings: &Settings,
    cell: CellId,
) -> Cache {
    let value = initial_coin_value(luck, cell, settings.initial_value_scale);
    let coin_ids = (0..value).map(|_| cells.mint_coin(cell)).collect();
    Cache::new(cell, cell.anchor(settings.tile_degrees), value, coin_ids)
}
