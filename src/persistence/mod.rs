//! Save/load persistence
//!
//! Features:
//! - Versioned JSON snapshot of player state and every cache
//! - Whole-snapshot validation before anything is applied
//! - Corrupt or missing saves read as "no save"

pub mod memento;
pub mod store;

pub use memento::{
    CacheMemento, PersistedSnapshot, SNAPSHOT_VERSION, decode_snapshot, deserialize_cache,
    encode_snapshot, serialize_cache,
};
#[cfg(target_arch = "wasm32")]
pub use store::LocalStore;
pub use store::{KeyValueStore, MemoryStore, StorageError};

use thiserror::Error;

use crate::consts::SAVE_KEY;
use crate::world::{CellId, CoinId, GameSession};

/// Why a snapshot could not be written or applied
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("cache {0} appears more than once")]
    DuplicateCache(CellId),
    #[error("coin {0} appears more than once")]
    DuplicateCoin(CoinId),
    #[error("coin {coin} does not belong to cache {cache}")]
    ForeignCoin { coin: CoinId, cache: CellId },
    #[error("coin {0} uses the last serial of its cell")]
    SerialExhausted(CoinId),
    #[error("position ({lat}, {lng}) is not on the globe")]
    OffGlobe { lat: f64, lng: f64 },
    #[error("cache {0} is not at its cell's corner")]
    MisplacedCache(CellId),
    #[error("{0} coins in play, more than a purse can hold")]
    TooManyCoins(u64),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Write the session snapshot to the store
pub fn save_game(session: &GameSession, store: &mut dyn KeyValueStore) -> Result<(), PersistenceError> {
    let json = encode_snapshot(&session.snapshot())?;
    store.set(SAVE_KEY, &json)?;
    log::info!(
        "Game saved ({} caches, {} points)",
        session.caches().len(),
        session.player().points
    );
    Ok(())
}

/// Read the saved snapshot, if there is a usable one
pub fn load_snapshot(store: &dyn KeyValueStore) -> Option<PersistedSnapshot> {
    let json = store.get(SAVE_KEY)?;
    match decode_snapshot(&json) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("Discarding unreadable save: {}", e);
            None
        }
    }
}

/// Remove the saved game
pub fn clear_saved_game(store: &mut dyn KeyValueStore) -> Result<(), PersistenceError> {
    store.remove(SAVE_KEY)?;
    log::info!("Saved game cleared");
    Ok(())
}
