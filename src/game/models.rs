//! In-memory records staged by the parser before being committed to
//! the store. These mirror the persisted rows but carry the dynamic
//! lists inline.

use crate::database::entities::{ExploredLevel, FighterType};
use crate::utils::types::{SectorIndex, MAX_WARPS};
use chrono::{NaiveDateTime, Utc};

/// The three products every port trades, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Product {
    FuelOre = 0,
    Organics = 1,
    Equipment = 2,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::FuelOre, Product::Organics, Product::Equipment];

    pub fn name(&self) -> &'static str {
        match self {
            Product::FuelOre => "Fuel Ore",
            Product::Organics => "Organics",
            Product::Equipment => "Equipment",
        }
    }
}

/// Port class strings in class-index order, index 1 first. `B` marks a
/// product the port buys, `S` one it sells.
const CLASS_STRINGS: [&str; 8] = ["BBS", "BSB", "SBB", "SSB", "SBS", "BSS", "SSS", "BBB"];

/// Derives the class index (1..8) from the three buy flags
pub fn class_index_from_flags(buy: [bool; 3]) -> i32 {
    let mut string = String::with_capacity(3);
    for flag in buy {
        string.push(if flag { 'B' } else { 'S' });
    }
    class_index_from_string(&string)
}

/// Maps a class string such as `BBS` to its class index, -1 when the
/// string is not a known class
pub fn class_index_from_string(value: &str) -> i32 {
    CLASS_STRINGS
        .iter()
        .position(|entry| entry.eq_ignore_ascii_case(value))
        .map(|position| position as i32 + 1)
        .unwrap_or(-1)
}

/// The display type for a class index; Stardock is `STD`
pub fn class_type(class_index: i32) -> &'static str {
    match class_index {
        1..=8 => CLASS_STRINGS[(class_index - 1) as usize],
        9 => "STD",
        _ => "???",
    }
}

/// Deployed fighter slot of a sector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FighterSlot {
    pub quantity: i64,
    pub owner: String,
    pub fig_type: FighterType,
}

/// One of the two mine slots of a sector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MineSlot {
    pub quantity: i64,
    pub owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ship {
    pub name: String,
    pub owner: String,
    pub ship_type: String,
    pub figs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trader {
    pub name: String,
    pub ship_type: String,
    pub ship_name: String,
    pub figs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Planet {
    pub name: String,
    pub owner: String,
    pub figs: i64,
    pub citadel: bool,
    pub stardock: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorVar {
    pub name: String,
    pub value: String,
}

/// Staged record of a sector including its dynamic lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorData {
    pub index: SectorIndex,
    pub constellation: String,
    pub beacon: String,
    pub nav_haz: i32,
    /// -1 until a density scan has been seen
    pub density: i64,
    pub anomaly: bool,
    pub explored: ExploredLevel,
    /// Outbound warp count. Kept in sync with the slots except for
    /// density-scanned sectors that were never visited.
    pub warps: i32,
    pub warp: [SectorIndex; MAX_WARPS],
    pub figs: FighterSlot,
    pub mines_armid: MineSlot,
    pub mines_limpet: MineSlot,
    pub last_update: NaiveDateTime,
    pub ships: Vec<Ship>,
    pub traders: Vec<Trader>,
    pub planets: Vec<Planet>,
    pub vars: Vec<SectorVar>,
}

impl SectorData {
    pub fn new(index: SectorIndex) -> Self {
        Self {
            index,
            constellation: String::new(),
            beacon: String::new(),
            nav_haz: 0,
            density: -1,
            anomaly: false,
            explored: ExploredLevel::NotVisited,
            warps: 0,
            warp: [0; MAX_WARPS],
            figs: FighterSlot::default(),
            mines_armid: MineSlot::default(),
            mines_limpet: MineSlot::default(),
            last_update: Utc::now().naive_utc(),
            ships: Vec::new(),
            traders: Vec::new(),
            planets: Vec::new(),
            vars: Vec::new(),
        }
    }

    /// Count of leading non-zero warp slots
    pub fn count_warps(&self) -> i32 {
        self.warp.iter().filter(|warp| **warp > 0).count() as i32
    }

    /// Inserts a warp target keeping the slots sorted ascending with no
    /// duplicates. Existing entries shift right to make room; a full
    /// slot array drops the largest entry.
    pub fn add_warp(&mut self, target: SectorIndex) {
        if target <= 0 || self.warp.contains(&target) {
            return;
        }
        // Find the slot this target sorts into
        let mut position = 0;
        while position < MAX_WARPS && self.warp[position] != 0 && self.warp[position] < target {
            position += 1;
        }
        if position >= MAX_WARPS {
            return;
        }
        for slot in (position + 1..MAX_WARPS).rev() {
            self.warp[slot] = self.warp[slot - 1];
        }
        self.warp[position] = target;
        self.warps = self.count_warps();
    }
}

/// Status and stock of one product at a port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductLine {
    pub buying: bool,
    pub percent: i32,
    pub amount: i64,
}

/// Staged record of a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortData {
    pub sector_index: SectorIndex,
    pub name: String,
    pub dead: bool,
    pub build_time: i32,
    /// 1..8 trade classes, 9 Stardock, 0 no port, -1 unknown
    pub class_index: i32,
    pub products: [ProductLine; 3],
    pub last_update: NaiveDateTime,
}

impl PortData {
    pub fn new(sector_index: SectorIndex) -> Self {
        Self {
            sector_index,
            name: String::new(),
            dead: false,
            build_time: 0,
            class_index: -1,
            products: [ProductLine::default(); 3],
            last_update: Utc::now().naive_utc(),
        }
    }

    pub fn product(&self, product: Product) -> &ProductLine {
        &self.products[product as usize]
    }

    pub fn product_mut(&mut self, product: Product) -> &mut ProductLine {
        &mut self.products[product as usize]
    }

    /// The three buy flags in product order
    pub fn buy_flags(&self) -> [bool; 3] {
        [
            self.products[0].buying,
            self.products[1].buying,
            self.products[2].buying,
        ]
    }
}

#[cfg(test)]
mod test {
    use super::{class_index_from_flags, class_index_from_string, class_type, SectorData};

    #[test]
    fn test_class_mapping() {
        assert_eq!(class_index_from_string("BBS"), 1);
        assert_eq!(class_index_from_string("BBB"), 8);
        assert_eq!(class_index_from_string("SSS"), 7);
        assert_eq!(class_index_from_string("XYZ"), -1);
        assert_eq!(class_index_from_flags([true, true, true]), 8);
        assert_eq!(class_index_from_flags([false, false, true]), 3);
        assert_eq!(class_type(9), "STD");
        assert_eq!(class_type(5), "SBS");
    }

    #[test]
    fn test_add_warp_ordered_dedup() {
        let mut sector = SectorData::new(1);
        sector.add_warp(5);
        sector.add_warp(2);
        sector.add_warp(5);
        sector.add_warp(9);
        assert_eq!(sector.warp, [2, 5, 9, 0, 0, 0]);
        assert_eq!(sector.warps, 3);
    }

    #[test]
    fn test_add_warp_ignores_invalid() {
        let mut sector = SectorData::new(1);
        sector.add_warp(0);
        sector.add_warp(-4);
        assert_eq!(sector.warps, 0);
    }
}
