//! Coin identity allocation
//!
//! Each cell keeps a monotonic serial counter. Minting a coin appends
//! `"{i}:{j}#{serial}"` to the cell's provenance list and bumps the counter.
//! Counters never go backwards, so a coin id is never handed out twice.
//!
//! The registry is plain owned state: whoever mints must hold `&mut`. All
//! minting happens on the single game thread, so that borrow is the only
//! serialization point.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::grid::{CellId, ParseIdError};

/// Globally unique, immutable coin identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CoinId {
    pub cell: CellId,
    pub serial: u32,
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.cell, self.serial)
    }
}

impl FromStr for CoinId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::Coin(s.to_string());
        let (cell, serial) = s.split_once('#').ok_or_else(err)?;
        Ok(Self {
            cell: cell.parse().map_err(|_| err())?,
            serial: serial.parse().map_err(|_| err())?,
        })
    }
}

impl From<CoinId> for String {
    fn from(coin: CoinId) -> Self {
        coin.to_string()
    }
}

impl TryFrom<String> for CoinId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Per-cell metadata (flyweight)
#[derive(Debug, Clone, Default)]
pub struct CellState {
    /// Next serial to hand out
    pub coin_serial: u32,
    /// Every coin ever minted here, in mint order
    pub coin_ids: Vec<CoinId>,
}

/// Lazily-populated cell metadata; entries are never removed
#[derive(Debug, Clone, Default)]
pub struct CellRegistry {
    cells: BTreeMap<CellId, CellState>,
}

impl CellRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up (creating on first reference) the state for a cell
    pub fn cell_mut(&mut self, cell: CellId) -> &mut CellState {
        self.cells.entry(cell).or_default()
    }

    pub fn get(&self, cell: CellId) -> Option<&CellState> {
        self.cells.get(&cell)
    }

    /// Allocate a fresh coin in `cell`
    pub fn mint_coin(&mut self, cell: CellId) -> CoinId {
        let state = self.cell_mut(cell);
        let coin = CoinId {
            cell,
            serial: state.coin_serial,
        };
        state.coin_serial = state.coin_serial.saturating_add(1);
        state.coin_ids.push(coin);
        coin
    }

    /// Record a coin minted elsewhere (e.g. loaded from a save) so its serial
    /// is never reissued. Already-known coins are left alone.
    pub fn reserve(&mut self, coin: CoinId) {
        let state = self.cell_mut(coin.cell);
        if coin.serial >= state.coin_serial {
            state.coin_serial = coin.serial.saturating_add(1);
        }
        if !state.coin_ids.contains(&coin) {
            state.coin_ids.push(coin);
        }
    }

    /// Number of cells referenced so far
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_increments_serial() {
        let mut cells = CellRegistry::new();
        let cell = CellId::new(5, -3);
        let a = cells.mint_coin(cell);
        let b = cells.mint_coin(cell);
        assert_eq!(a.to_string(), "5:-3#0");
        assert_eq!(b.to_string(), "5:-3#1");
        let state = cells.get(cell).unwrap();
        assert_eq!(state.coin_serial, 2);
        assert_eq!(state.coin_ids, vec![a, b]);
    }

    #[test]
    fn test_cells_count_independently() {
        let mut cells = CellRegistry::new();
        let a = cells.mint_coin(CellId::new(0, 0));
        let b = cells.mint_coin(CellId::new(0, 1));
        assert_eq!(a.serial, 0);
        assert_eq!(b.serial, 0);
        assert_ne!(a, b);
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_reserve_advances_counter() {
        let mut cells = CellRegistry::new();
        let cell = CellId::new(1, 1);
        cells.reserve(CoinId { cell, serial: 9 });
        let next = cells.mint_coin(cell);
        assert_eq!(next.serial, 10);

        // Reserving an older serial never rewinds
        cells.reserve(CoinId { cell, serial: 3 });
        assert_eq!(cells.get(cell).unwrap().coin_serial, 11);
    }

    #[test]
    fn test_reserve_is_idempotent() {
        let mut cells = CellRegistry::new();
        let coin = CoinId {
            cell: CellId::new(2, 2),
            serial: 0,
        };
        cells.reserve(coin);
        cells.reserve(coin);
        assert_eq!(cells.get(coin.cell).unwrap().coin_ids.len(), 1);
    }

    #[test]
    fn test_coin_id_parse() {
        let coin: CoinId = "-4:17#42".parse().unwrap();
        assert_eq!(coin.cell, CellId::new(-4, 17));
        assert_eq!(coin.serial, 42);
        assert!("4:17".parse::<CoinId>().is_err());
        assert!("4:17#x".parse::<CoinId>().is_err());
        assert!("4#17#1".parse::<CoinId>().is_err());
    }
}
