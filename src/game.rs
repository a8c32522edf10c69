//! Top-level driver
//!
//! Owns the session together with its collaborators and applies UI, sensor
//! and timer events one at a time. Every event runs to completion before the
//! next is looked at; there is no other path into the session.

use std::collections::VecDeque;

use crate::persistence::{self, KeyValueStore};
use crate::platform::MapLayer;
use crate::settings::Settings;
use crate::world::{
    CellId, CommandError, Direction, GameSession, LatLng, SyncReport, TrackingToken, Transfer,
};

/// Input to the game, from buttons, keys, the location sensor or a timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Move(Direction),
    Collect(CellId),
    Deposit(CellId),
    Save,
    Load,
    /// Fresh game; the saved game is deleted
    Reset,
    /// Fresh game; the save is left for autosave to overwrite
    NewGame,
    StartTracking,
    StopTracking,
    SensorFix {
        token: TrackingToken,
        position: LatLng,
    },
    /// Periodic viewport resync
    Resync,
}

/// What an event did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventOutcome {
    Synced(SyncReport),
    Transfer(Transfer),
    Rejected(CommandError),
    Saved,
    SaveFailed,
    Loaded(SyncReport),
    NoSave,
    Started(SyncReport),
    TrackingStarted(TrackingToken),
    TrackingStopped,
    StaleFix,
}

/// Game instance holding all state
pub struct Game<S: KeyValueStore, M: MapLayer> {
    session: GameSession,
    store: S,
    map: M,
    queue: VecDeque<GameEvent>,
}

impl<S: KeyValueStore, M: MapLayer> Game<S, M> {
    /// Start from whatever the store holds: a valid save is resumed,
    /// anything else starts a fresh game.
    pub fn boot(store: S, map: M) -> Self {
        let settings = Settings::load(&store);
        let session = GameSession::with_settings(settings);
        let mut game = Self::with_session(session, store, map);

        let resumed = match persistence::load_snapshot(&game.store) {
            Some(snapshot) => match game.session.restore(snapshot, &mut game.map) {
                Ok(_) => {
                    log::info!(
                        "Resumed saved game ({} points)",
                        game.session.player().points
                    );
                    true
                }
                Err(e) => {
                    log::warn!("Saved game rejected: {}", e);
                    false
                }
            },
            None => false,
        };
        if !resumed {
            game.session.update_caches(&mut game.map);
            log::info!("Started new game");
        }
        game.autosave();
        game
    }

    /// Wrap an existing session without touching the store
    pub fn with_session(session: GameSession, store: S, map: M) -> Self {
        Self {
            session,
            store,
            map,
            queue: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Status panel text
    pub fn status_line(&self) -> String {
        match self.session.player().points {
            0 => "No points yet...".to_string(),
            n => format!("{} points accumulated", n),
        }
    }

    /// Queue an event for the next `process_pending`
    pub fn enqueue(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    /// Apply queued events in arrival order
    pub fn process_pending(&mut self) -> Vec<EventOutcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop_front() {
            outcomes.push(self.dispatch(event));
        }
        outcomes
    }

    /// Apply one event now
    pub fn dispatch(&mut self, event: GameEvent) -> EventOutcome {
        let outcome = match event {
            GameEvent::Move(direction) => {
                EventOutcome::Synced(self.session.move_player(direction, &mut self.map))
            }
            GameEvent::Collect(cell) => match self.session.apply_collect(cell, &mut self.map) {
                Ok(transfer) => EventOutcome::Transfer(transfer),
                Err(e) => EventOutcome::Rejected(e),
            },
            GameEvent::Deposit(cell) => match self.session.apply_deposit(cell, &mut self.map) {
                Ok(transfer) => EventOutcome::Transfer(transfer),
                Err(e) => {
                    log::info!("{}", e);
                    EventOutcome::Rejected(e)
                }
            },
            GameEvent::Save => return self.save(),
            GameEvent::Load => self.load(),
            GameEvent::Reset => {
                let report = self.session.reset(&mut self.map);
                // Nothing of the old game survives, not even the save
                self.session.take_dirty();
                if let Err(e) = persistence::clear_saved_game(&mut self.store) {
                    log::warn!("Saved game not cleared: {}", e);
                }
                log::info!("Game reset");
                return EventOutcome::Started(report);
            }
            GameEvent::NewGame => {
                let report = self.session.reset(&mut self.map);
                log::info!("Started new game");
                EventOutcome::Started(report)
            }
            GameEvent::StartTracking => EventOutcome::TrackingStarted(self.session.start_tracking()),
            GameEvent::StopTracking => {
                self.session.stop_tracking();
                EventOutcome::TrackingStopped
            }
            GameEvent::SensorFix { token, position } => {
                match self.session.apply_sensor_fix(token, position, &mut self.map) {
                    Some(report) => EventOutcome::Synced(report),
                    None => EventOutcome::StaleFix,
                }
            }
            GameEvent::Resync => EventOutcome::Synced(self.session.update_caches(&mut self.map)),
        };

        self.autosave();
        outcome
    }

    fn save(&mut self) -> EventOutcome {
        self.session.take_dirty();
        match persistence::save_game(&self.session, &mut self.store) {
            Ok(()) => EventOutcome::Saved,
            Err(e) => {
                log::warn!("Save failed: {}", e);
                EventOutcome::SaveFailed
            }
        }
    }

    fn load(&mut self) -> EventOutcome {
        let Some(snapshot) = persistence::load_snapshot(&self.store) else {
            log::info!("No saved game to load");
            return EventOutcome::NoSave;
        };
        match self.session.restore(snapshot, &mut self.map) {
            Ok(report) => {
                log::info!("Loaded saved game ({} points)", self.session.player().points);
                EventOutcome::Loaded(report)
            }
            Err(e) => {
                log::warn!("Saved game rejected: {}", e);
                EventOutcome::NoSave
            }
        }
    }

    /// Save if autosave is on and something changed since the last save
    fn autosave(&mut self) {
        if self.session.settings().autosave && self.session.take_dirty() {
            if let Err(e) = persistence::save_game(&self.session, &mut self.store) {
                log::warn!("Autosave failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SAVE_KEY;
    use crate::persistence::MemoryStore;
    use crate::platform::RecordingLayer;
    use crate::world::TableLuck;

    const TILE: f64 = 0.0001;

    fn scenario_settings(autosave: bool) -> Settings {
        Settings {
            neighborhood_size: 2,
            origin: LatLng::new(5.5 * TILE, -2.5 * TILE),
            autosave,
            ..Default::default()
        }
    }

    fn scenario_game(autosave: bool) -> Game<MemoryStore, RecordingLayer> {
        let luck = TableLuck::new(0.99)
            .with("5,-3", 0.03)
            .with("5,-3,initialValue", 0.42);
        let mut session = GameSession::new(scenario_settings(autosave), Box::new(luck));
        let mut map = RecordingLayer::new();
        session.update_caches(&mut map);
        Game::with_session(session, MemoryStore::new(), map)
    }

    const CELL: CellId = CellId::new(5, -3);

    #[test]
    fn test_events_apply_in_order() {
        let mut game = scenario_game(false);
        game.enqueue(GameEvent::Collect(CELL));
        game.enqueue(GameEvent::Collect(CELL));
        game.enqueue(GameEvent::Deposit(CELL));
        let outcomes = game.process_pending();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[2],
            EventOutcome::Transfer(Transfer::Moved {
                cache_value: 41,
                player_points: 1
            })
        );
        assert_eq!(game.status_line(), "1 points accumulated");
        assert!(game.process_pending().is_empty());
    }

    #[test]
    fn test_deposit_rejected_without_coins() {
        let mut game = scenario_game(false);
        assert_eq!(
            game.dispatch(GameEvent::Deposit(CELL)),
            EventOutcome::Rejected(CommandError::NothingToDeposit)
        );
        assert_eq!(game.status_line(), "No points yet...");
    }

    #[test]
    fn test_save_and_load() {
        let mut game = scenario_game(false);
        game.dispatch(GameEvent::Collect(CELL));
        assert_eq!(game.dispatch(GameEvent::Save), EventOutcome::Saved);
        game.dispatch(GameEvent::Collect(CELL));
        game.dispatch(GameEvent::Move(Direction::North));

        assert!(matches!(game.dispatch(GameEvent::Load), EventOutcome::Loaded(_)));
        assert_eq!(game.session().player().points, 1);
        assert_eq!(game.session().cache(CELL).unwrap().coin_value, 41);
        assert_eq!(game.session().player().trail.len(), 1);
    }

    #[test]
    fn test_load_without_save_keeps_session() {
        let mut game = scenario_game(false);
        game.dispatch(GameEvent::Collect(CELL));
        assert_eq!(game.dispatch(GameEvent::Load), EventOutcome::NoSave);
        assert_eq!(game.session().player().points, 1);
    }

    #[test]
    fn test_load_corrupt_save_keeps_session() {
        let mut game = scenario_game(false);
        game.dispatch(GameEvent::Collect(CELL));
        game.store.set(SAVE_KEY, "garbage").unwrap();
        assert_eq!(game.dispatch(GameEvent::Load), EventOutcome::NoSave);
        assert_eq!(game.session().player().points, 1);
    }

    #[test]
    fn test_autosave_after_changes() {
        let mut game = scenario_game(true);
        game.dispatch(GameEvent::Collect(CELL));
        let saved = persistence::load_snapshot(game.store()).unwrap();
        assert_eq!(saved.player_points, 1);
    }

    #[test]
    fn test_reset_clears_save() {
        let mut game = scenario_game(true);
        game.dispatch(GameEvent::Collect(CELL));
        assert!(game.store().get(SAVE_KEY).is_some());

        assert!(matches!(game.dispatch(GameEvent::Reset), EventOutcome::Started(_)));
        assert!(game.store().get(SAVE_KEY).is_none());
        assert_eq!(game.session().player().points, 0);
        assert_eq!(game.session().cache(CELL).unwrap().coin_value, 42);
    }

    #[test]
    fn test_stale_sensor_fix_after_stop() {
        let mut game = scenario_game(false);
        let EventOutcome::TrackingStarted(token) = game.dispatch(GameEvent::StartTracking) else {
            panic!("tracking did not start");
        };
        game.enqueue(GameEvent::StopTracking);
        game.enqueue(GameEvent::SensorFix {
            token,
            position: LatLng::new(1.0, 1.0),
        });
        let outcomes = game.process_pending();
        assert_eq!(outcomes[1], EventOutcome::StaleFix);
        assert_eq!(game.session().player().position, scenario_settings(false).origin);
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut game = scenario_game(false);
        assert_eq!(
            game.dispatch(GameEvent::Resync),
            EventOutcome::Synced(SyncReport::default())
        );
        assert_eq!(game.map().live(), 1);
    }

    #[test]
    fn test_boot_resumes_save() {
        let mut game = scenario_game(false);
        game.dispatch(GameEvent::Collect(CELL));
        game.dispatch(GameEvent::Save);
        let store = game.store().clone();

        let booted = Game::boot(store, RecordingLayer::new());
        assert_eq!(booted.session().player().points, 1);
        assert_eq!(booted.session().cache(CELL).unwrap().coin_value, 41);
        assert!(booted.session().cache(CELL).unwrap().visible);
    }

    #[test]
    fn test_boot_with_empty_store_starts_fresh() {
        let booted = Game::boot(MemoryStore::new(), RecordingLayer::new());
        let settings = Settings::default();
        assert_eq!(booted.session().player().position, settings.origin);
        assert_eq!(booted.session().player().points, 0);
        // Autosave wrote the freshly generated world if anything spawned
        assert_eq!(
            booted.store().get(SAVE_KEY).is_some(),
            !booted.session().caches().is_empty()
        );
    }
}
