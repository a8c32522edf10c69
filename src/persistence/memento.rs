//! Snapshot and cache memento formats
//!
//! JSON shape:
//! `{ version, playerPosition:{lat,lng}, playerPoints, movementHistory:[[lat,lng]...],
//!    caches:[{id, lat, lng, coinValue, coinIds:[...]}...] }`

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::PersistenceError;
use crate::world::{Cache, CellId, CoinId, LatLng};

/// Current snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Minimal record to rebuild a cache without rerunning generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMemento {
    pub id: CellId,
    pub lat: f64,
    pub lng: f64,
    pub coin_value: u32,
    pub coin_ids: Vec<CoinId>,
}

impl From<&Cache> for CacheMemento {
    fn from(cache: &Cache) -> Self {
        CacheMemento {
            id: cache.id,
            lat: cache.anchor.lat,
            lng: cache.anchor.lng,
            coin_value: cache.coin_value,
            coin_ids: cache.coin_ids.clone(),
        }
    }
}

impl CacheMemento {
    /// Every coin belongs to this cell, leaves room for the next serial,
    /// and none is in `seen` yet
    fn check_coins(&self, seen: &mut HashSet<CoinId>) -> Result<(), PersistenceError> {
        for coin in &self.coin_ids {
            if coin.cell != self.id {
                return Err(PersistenceError::ForeignCoin {
                    coin: *coin,
                    cache: self.id,
                });
            }
            if coin.serial == u32::MAX {
                return Err(PersistenceError::SerialExhausted(*coin));
            }
            if !seen.insert(*coin) {
                return Err(PersistenceError::DuplicateCoin(*coin));
            }
        }
        Ok(())
    }

    fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

fn check_on_globe(position: LatLng) -> Result<(), PersistenceError> {
    if position.is_on_globe() {
        Ok(())
    } else {
        Err(PersistenceError::OffGlobe {
            lat: position.lat,
            lng: position.lng,
        })
    }
}

/// Restored caches start hidden; a viewport sync decides visibility
impl From<CacheMemento> for Cache {
    fn from(memento: CacheMemento) -> Self {
        Cache::new(
            memento.id,
            LatLng::new(memento.lat, memento.lng),
            memento.coin_value,
            memento.coin_ids,
        )
    }
}

/// Everything needed to resume a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub player_position: LatLng,
    pub player_points: u32,
    #[serde(default)]
    pub movement_history: Vec<[f64; 2]>,
    #[serde(default)]
    pub caches: Vec<CacheMemento>,
}

impl PersistedSnapshot {
    /// Check internal consistency: known version, every position on the
    /// globe, one memento per cell, no coin listed twice, every coin minted
    /// in its cache's cell, and all coins together fit in a `u32`.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.version == 0 || self.version > SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }

        check_on_globe(self.player_position)?;
        for &step in &self.movement_history {
            check_on_globe(step.into())?;
        }

        let mut cache_ids = HashSet::new();
        let mut coin_ids = HashSet::new();
        let mut total = u64::from(self.player_points);
        for memento in &self.caches {
            check_on_globe(memento.position())?;
            if !cache_ids.insert(memento.id) {
                return Err(PersistenceError::DuplicateCache(memento.id));
            }
            memento.check_coins(&mut coin_ids)?;
            total += u64::from(memento.coin_value);
        }
        if total > u64::from(u32::MAX) {
            return Err(PersistenceError::TooManyCoins(total));
        }
        Ok(())
    }

    /// Every cache sits on its cell's anchor for a grid of `tile` degrees
    pub fn check_grid(&self, tile: f64) -> Result<(), PersistenceError> {
        let tolerance = tile * 1e-6;
        for memento in &self.caches {
            let anchor = memento.id.anchor(tile);
            if (memento.lat - anchor.lat).abs() > tolerance
                || (memento.lng - anchor.lng).abs() > tolerance
            {
                return Err(PersistenceError::MisplacedCache(memento.id));
            }
        }
        Ok(())
    }
}

/// Serialize a snapshot to JSON
pub fn encode_snapshot(snapshot: &PersistedSnapshot) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Parse and validate a snapshot
pub fn decode_snapshot(json: &str) -> Result<PersistedSnapshot, PersistenceError> {
    let snapshot: PersistedSnapshot = serde_json::from_str(json)?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Serialize one cache as its memento
pub fn serialize_cache(cache: &Cache) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(&CacheMemento::from(cache))?)
}

/// Rebuild a (hidden) cache from its serialized memento
pub fn deserialize_cache(json: &str) -> Result<Cache, PersistenceError> {
    let memento: CacheMemento = serde_json::from_str(json)?;
    check_on_globe(memento.position())?;
    memento.check_coins(&mut HashSet::new())?;
    Ok(Cache::from(memento))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(i: i32, j: i32, serial: u32) -> CoinId {
        CoinId {
            cell: CellId::new(i, j),
            serial,
        }
    }

    fn memento(i: i32, j: i32, coins: u32) -> CacheMemento {
        CacheMemento {
            id: CellId::new(i, j),
            lat: i as f64 * 0.0001,
            lng: j as f64 * 0.0001,
            coin_value: coins,
            coin_ids: (0..coins).map(|s| coin(i, j, s)).collect(),
        }
    }

    fn snapshot(caches: Vec<CacheMemento>) -> PersistedSnapshot {
        PersistedSnapshot {
            version: SNAPSHOT_VERSION,
            player_position: LatLng::new(0.00055, -0.00025),
            player_points: 3,
            movement_history: vec![[0.00055, -0.00035], [0.00055, -0.00025]],
            caches,
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = encode_snapshot(&snapshot(vec![memento(5, -3, 2)])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["playerPoints"], 3);
        assert_eq!(value["playerPosition"]["lat"], 0.00055);
        assert_eq!(value["movementHistory"][1][1], -0.00025);
        assert_eq!(value["caches"][0]["id"], "5:-3");
        assert_eq!(value["caches"][0]["coinValue"], 2);
        assert_eq!(value["caches"][0]["coinIds"][1], "5:-3#1");
    }

    #[test]
    fn test_decode_accepts_encoded() {
        let original = snapshot(vec![memento(5, -3, 4), memento(0, 1, 0)]);
        let json = encode_snapshot(&original).unwrap();
        assert_eq!(decode_snapshot(&json).unwrap(), original);
    }

    #[test]
    fn test_missing_version_defaults() {
        let json = r#"{"playerPosition":{"lat":1.0,"lng":2.0},"playerPoints":0,"movementHistory":[],"caches":[]}"#;
        assert_eq!(decode_snapshot(json).unwrap().version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_rejects_future_version() {
        let mut s = snapshot(vec![]);
        s.version = SNAPSHOT_VERSION + 1;
        assert!(matches!(
            s.validate(),
            Err(PersistenceError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_cache() {
        let s = snapshot(vec![memento(1, 1, 1), memento(1, 1, 1)]);
        assert!(matches!(
            s.validate(),
            Err(PersistenceError::DuplicateCache(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_coin() {
        let mut m = memento(1, 1, 2);
        m.coin_ids.push(coin(1, 1, 0));
        assert!(matches!(
            snapshot(vec![m]).validate(),
            Err(PersistenceError::DuplicateCoin(_))
        ));
    }

    #[test]
    fn test_rejects_foreign_coin() {
        let mut m = memento(1, 1, 1);
        m.coin_ids.push(coin(2, 2, 0));
        assert!(matches!(
            snapshot(vec![m]).validate(),
            Err(PersistenceError::ForeignCoin { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_ids_and_negatives() {
        let bad_cell = r#"{"playerPosition":{"lat":1.0,"lng":2.0},"playerPoints":0,
            "caches":[{"id":"5,-3","lat":0.0,"lng":0.0,"coinValue":1,"coinIds":[]}]}"#;
        assert!(matches!(decode_snapshot(bad_cell), Err(PersistenceError::Json(_))));

        let negative = r#"{"playerPosition":{"lat":1.0,"lng":2.0},"playerPoints":-1}"#;
        assert!(matches!(decode_snapshot(negative), Err(PersistenceError::Json(_))));
    }

    #[test]
    fn test_cache_memento_functions() {
        let mut cache = Cache::from(memento(5, -3, 3));
        cache.coin_value = 1;
        cache.visible = true;
        let json = serialize_cache(&cache).unwrap();
        let back = deserialize_cache(&json).unwrap();
        assert_eq!(back.id, cache.id);
        assert_eq!(back.coin_value, 1);
        assert_eq!(back.coin_ids, cache.coin_ids);
        assert!(!back.visible);
    }

    #[test]
    fn test_rejects_positions_off_globe() {
        let mut s = snapshot(vec![]);
        s.player_position = LatLng::new(300_000.0, 0.0);
        assert!(matches!(s.validate(), Err(PersistenceError::OffGlobe { .. })));

        let mut s = snapshot(vec![]);
        s.movement_history.push([0.0, f64::INFINITY]);
        assert!(matches!(s.validate(), Err(PersistenceError::OffGlobe { .. })));

        let mut m = memento(5, -3, 1);
        m.lng = -500.0;
        assert!(matches!(
            snapshot(vec![m]).validate(),
            Err(PersistenceError::OffGlobe { .. })
        ));

        let json = r#"{"playerPosition":{"lat":300000.0,"lng":0.0},"playerPoints":0}"#;
        assert!(decode_snapshot(json).is_err());
    }

    #[test]
    fn test_rejects_coin_total_past_u32() {
        let mut s = snapshot(vec![memento(5, -3, 2)]);
        s.player_points = u32::MAX - 1;
        assert!(matches!(s.validate(), Err(PersistenceError::TooManyCoins(_))));
        s.player_points = u32::MAX - 2;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_rejects_last_serial() {
        let mut m = memento(5, -3, 1);
        m.coin_ids.push(coin(5, -3, u32::MAX));
        assert!(matches!(
            snapshot(vec![m]).validate(),
            Err(PersistenceError::SerialExhausted(_))
        ));
    }

    #[test]
    fn test_check_grid_wants_anchors() {
        let s = snapshot(vec![memento(5, -3, 1), memento(-2, 7, 0)]);
        assert!(s.check_grid(0.0001).is_ok());
        assert!(matches!(
            s.check_grid(0.001),
            Err(PersistenceError::MisplacedCache(_))
        ));

        let mut m = memento(5, -3, 1);
        m.lat = 0.0;
        assert!(matches!(
            snapshot(vec![m]).check_grid(0.0001),
            Err(PersistenceError::MisplacedCache(id)) if id == CellId::new(5, -3)
        ));
    }
}
