//! Geocoin entry point
//!
//! Handles platform-specific initialization and wires input to the game.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use geocoin::persistence::LocalStore;
    use geocoin::platform::LogLayer;
    use geocoin::world::cell_of;
    use geocoin::{Direction, EventOutcome, Game, GameEvent};

    type WebGame = Game<LocalStore, LogLayer>;

    /// Cell under the player, where collect/deposit keys act
    fn current_cell(game: &WebGame) -> geocoin::CellId {
        let session = game.session();
        cell_of(session.player().position, session.settings().tile_degrees)
    }

    /// Drain queued events, then refresh the status panel
    fn pump(game: &Rc<RefCell<WebGame>>) {
        let mut g = game.borrow_mut();
        for outcome in g.process_pending() {
            if let EventOutcome::Rejected(e) = outcome {
                if let Some(window) = web_sys::window() {
                    let _ = window.alert_with_message(&e.to_string());
                }
            }
        }
        update_status(&g);
    }

    fn update_status(game: &WebGame) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id("statusPanel") {
            el.set_text_content(Some(&game.status_line()));
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Geocoin starting...");

        let game = Rc::new(RefCell::new(Game::boot(
            LocalStore::open(),
            LogLayer::default(),
        )));
        update_status(&game.borrow());

        setup_keyboard(game.clone());
        setup_buttons(game);

        log::info!("Geocoin running!");
    }

    fn setup_keyboard(game: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let here = current_cell(&game.borrow());
            let next = match event.key().as_str() {
                "ArrowUp" => Some(GameEvent::Move(Direction::North)),
                "ArrowDown" => Some(GameEvent::Move(Direction::South)),
                "ArrowRight" => Some(GameEvent::Move(Direction::East)),
                "ArrowLeft" => Some(GameEvent::Move(Direction::West)),
                "c" | "C" => Some(GameEvent::Collect(here)),
                "d" | "D" => Some(GameEvent::Deposit(here)),
                _ => None,
            };
            if let Some(next) = next {
                game.borrow_mut().enqueue(next);
                pump(&game);
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(game: Rc<RefCell<WebGame>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let buttons = [
            ("north", GameEvent::Move(Direction::North)),
            ("south", GameEvent::Move(Direction::South)),
            ("east", GameEvent::Move(Direction::East)),
            ("west", GameEvent::Move(Direction::West)),
            ("save", GameEvent::Save),
            ("load", GameEvent::Load),
            ("reset", GameEvent::Reset),
        ];

        for (id, event) in buttons {
            if let Some(btn) = document.get_element_by_id(id) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                    game.borrow_mut().enqueue(event);
                    pump(&game);
                });
                let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Geocoin (native) starting...");
    log::info!("Native mode has no map - run with `trunk serve` for the web version");

    demo_walk();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Walk a short loop around the origin, collecting from every cache passed
#[cfg(not(target_arch = "wasm32"))]
fn demo_walk() {
    use geocoin::persistence::MemoryStore;
    use geocoin::platform::RecordingLayer;
    use geocoin::world::cell_of;
    use geocoin::{Direction, Game, GameEvent};

    let mut game = Game::boot(MemoryStore::new(), RecordingLayer::new());
    let route = [
        Direction::North,
        Direction::North,
        Direction::East,
        Direction::East,
        Direction::South,
        Direction::South,
        Direction::West,
        Direction::West,
    ];

    for step in route {
        game.dispatch(GameEvent::Move(step));
        let session = game.session();
        let here = cell_of(session.player().position, session.settings().tile_degrees);
        if session.cache(here).is_some_and(|c| c.coin_value > 0) {
            game.dispatch(GameEvent::Collect(here));
        }
    }

    let session = game.session();
    println!(
        "{} caches known, {} on the map, {} coins in play",
        session.caches().len(),
        game.map().live(),
        session.total_coins()
    );
    println!("{}", game.status_line());
}
