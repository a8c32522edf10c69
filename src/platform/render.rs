//! Map layer collaborator
//!
//! Mirrors the three calls a slippy-map library exposes for cache markers:
//! add a rectangle, remove a layer, bind a popup to it.

use std::collections::BTreeMap;

use crate::world::grid::{CellBounds, CellId};

/// Opaque handle to a rectangle on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerHandle(pub u32);

/// Everything a cache popup shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePopup {
    pub cell: CellId,
    pub coin_value: u32,
}

impl CachePopup {
    /// Popup body text
    pub fn text(&self) -> String {
        format!(
            "There is a cache here at \"{}\". It has value {}.",
            self.cell, self.coin_value
        )
    }
}

/// Render collaborator
pub trait MapLayer {
    /// Draw a cell rectangle and return its handle
    fn add_rectangle(&mut self, bounds: CellBounds) -> LayerHandle;
    /// Remove a previously added layer (unknown handles are ignored)
    fn remove_layer(&mut self, handle: LayerHandle);
    /// Bind (or rebind) popup content to a layer
    fn attach_popup(&mut self, handle: LayerHandle, popup: CachePopup);
}

/// In-memory map that remembers what is drawn
#[derive(Debug, Default)]
pub struct RecordingLayer {
    next_handle: u32,
    pub rectangles: BTreeMap<LayerHandle, CellBounds>,
    pub popups: BTreeMap<LayerHandle, CachePopup>,
    /// Total `add_rectangle` calls
    pub added: usize,
    /// Total `remove_layer` calls that hit a live layer
    pub removed: usize,
}

impl RecordingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers currently on the map
    pub fn live(&self) -> usize {
        self.rectangles.len()
    }

    /// Popup currently bound for a cell, if its layer is live
    pub fn popup_for(&self, cell: CellId) -> Option<&CachePopup> {
        self.popups.values().find(|p| p.cell == cell)
    }
}

impl MapLayer for RecordingLayer {
    fn add_rectangle(&mut self, bounds: CellBounds) -> LayerHandle {
        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;
        self.rectangles.insert(handle, bounds);
        self.added += 1;
        handle
    }

    fn remove_layer(&mut self, handle: LayerHandle) {
        if self.rectangles.remove(&handle).is_some() {
            self.removed += 1;
        }
        self.popups.remove(&handle);
    }

    fn attach_popup(&mut self, handle: LayerHandle, popup: CachePopup) {
        if self.rectangles.contains_key(&handle) {
            self.popups.insert(handle, popup);
        }
    }
}

/// Map stand-in that only logs; used where no real map is attached
#[derive(Debug, Default)]
pub struct LogLayer {
    next_handle: u32,
}

impl MapLayer for LogLayer {
    fn add_rectangle(&mut self, bounds: CellBounds) -> LayerHandle {
        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;
        log::debug!(
            "layer {} added at ({:.5}, {:.5})",
            handle.0,
            bounds.south_west.lat,
            bounds.south_west.lng
        );
        handle
    }

    fn remove_layer(&mut self, handle: LayerHandle) {
        log::debug!("layer {} removed", handle.0);
    }

    fn attach_popup(&mut self, handle: LayerHandle, popup: CachePopup) {
        log::debug!("layer {}: {}", handle.0, popup.text());
    }
}
