//! Deterministic world module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Cache contents derive only from the luck function and cell coordinates
//! - Stable iteration order (by cell id)
//! - No rendering or storage dependencies beyond the collaborator traits

pub mod cache;
pub mod coin;
pub mod grid;
pub mod luck;
pub mod registry;
pub mod session;
pub mod viewport;

pub use cache::{Cache, generate_cache, initial_coin_value, should_spawn};
pub use coin::{CellRegistry, CellState, CoinId};
pub use grid::{CellBounds, CellId, LatLng, ParseIdError, cell_of};
pub use luck::{HashLuck, Luck, TableLuck};
pub use registry::{CacheRegistry, SpawnOutcome};
pub use session::{CommandError, Direction, GameSession, PlayerState, TrackingToken, Transfer};
pub use viewport::{SyncReport, Viewport};
