use super::types::{SurfaceId, TileSurface};
use crate::core::geo::Point;
use crate::prelude::{Arc, HashMap};
use std::sync::Mutex;

/// Drawing container the tile layer attaches its surfaces to.
///
/// The layer only tells the pane what to show and where; decoding and
/// compositing are up to the host.
pub trait TilePane: Send {
    fn append(&mut self, surface: &TileSurface);

    fn remove(&mut self, surface: &TileSurface);

    /// Detaches every surface at once
    fn clear(&mut self);

    fn set_opacity(&mut self, _opacity: f32) {}

    /// Called before a pooled surface is reused for another tile
    fn reset_surface(&mut self, _surface: &mut TileSurface) {}
}

/// What a [`MemoryPane`] knows about one attached surface
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSurface {
    pub position: Point,
    pub src: String,
}

#[derive(Debug, Default)]
struct PaneState {
    surfaces: HashMap<SurfaceId, PlacedSurface>,
    opacity: Option<f32>,
}

/// Headless pane that records attached surfaces.
///
/// Clones share state, which lets a host or a test inspect the pane a layer
/// owns.
#[derive(Debug, Clone, Default)]
pub struct MemoryPane {
    state: Arc<Mutex<PaneState>>,
}

impl MemoryPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.surfaces.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.state
            .lock()
            .map(|s| s.surfaces.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn get(&self, id: SurfaceId) -> Option<PlacedSurface> {
        self.state.lock().ok()?.surfaces.get(&id).cloned()
    }

    pub fn opacity(&self) -> Option<f32> {
        self.state.lock().ok()?.opacity
    }
}

impl TilePane for MemoryPane {
    fn append(&mut self, surface: &TileSurface) {
        if let Ok(mut state) = self.state.lock() {
            state.surfaces.insert(
                surface.id,
                PlacedSurface {
                    position: surface.position,
                    src: surface.src.clone(),
                },
            );
        }
    }

    fn remove(&mut self, surface: &TileSurface) {
        if let Ok(mut state) = self.state.lock() {
            state.surfaces.remove(&surface.id);
        }
    }

    fn clear(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.surfaces.clear();
        }
    }

    fn set_opacity(&mut self, opacity: f32) {
        if let Ok(mut state) = self.state.lock() {
            state.opacity = Some(opacity);
        }
    }
}
