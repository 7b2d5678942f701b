/// Type alias for sector numbers. Sectors are 1-based positive
/// indexes into the universe graph; zero marks an unused warp slot.
pub type SectorIndex = i32;

/// Unique ID type used for loaded scripts
pub type ScriptId = uuid::Uuid;

/// Number of outbound warp slots a sector carries
pub const MAX_WARPS: usize = 6;
