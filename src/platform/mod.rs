//! Platform abstraction layer
//!
//! The core never draws anything itself. It talks to the map through
//! `MapLayer`, which the browser (or a test) implements.

pub mod render;

pub use render::{CachePopup, LayerHandle, LogLayer, MapLayer, RecordingLayer};
