use crate::utils::types::SectorIndex;
use std::sync::atomic::{AtomicI32, Ordering};

/// Shared session state mined from the stream, readable from the API
/// surface without touching the pipeline task
#[derive(Default)]
pub struct GameState {
    current_sector: AtomicI32,
}

impl GameState {
    pub fn current_sector(&self) -> SectorIndex {
        self.current_sector.load(Ordering::Acquire)
    }

    /// Records a new current sector, returning whether the value
    /// changed
    pub fn set_current_sector(&self, sector: SectorIndex) -> bool {
        self.current_sector.swap(sector, Ordering::AcqRel) != sector
    }
}
