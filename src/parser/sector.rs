//! Sector display block: ten character headers open each list and
//! continuation lines indented by eight spaces extend the last one.

use super::{GameParser, SectorPosition};
use crate::database::entities::FighterType;
use crate::game::models::{class_index_from_string, Planet, PortData, Ship, Trader};
use crate::utils::parsing::{int_commas, param, param_int, params};
use chrono::Utc;

/// Port line marker for a destroyed port
const PORT_DANGER: &str = "<=-DANGER-=>";

impl GameParser {
    pub(crate) async fn process_sector_line(&mut self, line: &str) {
        if line.starts_with("        ") {
            self.process_sector_continuation(line).await;
            return;
        }

        let Some(header) = line.get(..10) else {
            return;
        };
        let rest = &line[10..];

        match header {
            // Handled when the block began
            "Sector  : " => {}
            "Beacon  : " => {
                self.current_sector.beacon = rest.trim().to_string();
            }
            "Ports   : " => {
                self.parse_port_header(rest);
                self.set_sector_position(SectorPosition::Ports);
            }
            "Planets : " => {
                self.push_planet(rest.trim());
                self.set_sector_position(SectorPosition::Planets);
            }
            "Traders : " => {
                self.flush_trader();
                self.begin_trader(rest.trim());
                self.set_sector_position(SectorPosition::Traders);
            }
            "Ships   : " => {
                if let Some(ship) = parse_ship(rest.trim()) {
                    self.current_sector.ships.push(ship);
                }
                self.set_sector_position(SectorPosition::Ships);
            }
            "Fighters: " => {
                self.parse_fighters(rest.trim());
            }
            "Mines   : " => {
                self.parse_mines(line);
                self.set_sector_position(SectorPosition::Mines);
            }
            "NavHaz  : " => {
                let parts = params(line);
                if let Ok(percent) = param_int(&parts, 3) {
                    self.current_sector.nav_haz = percent as i32;
                }
            }
            _ => {
                if line.starts_with("Warps to Sector(s) :") {
                    self.parse_warps(line).await;
                }
            }
        }
    }

    /// Continuation lines begin with eight spaces and extend whichever
    /// list opened last
    async fn process_sector_continuation(&mut self, line: &str) {
        let trimmed = line.trim();
        match self.sector_position() {
            SectorPosition::Ports => {
                let parts = params(line);
                if let Ok(build_time) = param_int(&parts, 4) {
                    if let Some(port) = self.staged_port.as_mut() {
                        port.build_time = build_time as i32;
                    }
                }
            }
            SectorPosition::Planets => {
                self.push_planet(trimmed);
            }
            SectorPosition::Traders => {
                if trimmed.starts_with("in ") {
                    self.finish_trader(trimmed);
                } else {
                    self.flush_trader();
                    self.begin_trader(trimmed);
                }
            }
            SectorPosition::Ships => {
                if trimmed.contains(" in ") || trimmed.contains("[Owned by]") {
                    if let Some(ship) = parse_ship(trimmed) {
                        self.current_sector.ships.push(ship);
                    }
                }
            }
            SectorPosition::Mines => {
                if trimmed.contains("Limpet") {
                    self.parse_limpet_continuation(trimmed);
                }
            }
            SectorPosition::Normal => {}
        }
    }

    /// `Ports   : <name>, Class <n> (<type>) <BSB>`
    fn parse_port_header(&mut self, rest: &str) {
        let mut port = PortData::new(self.current_sector.index);

        if rest.contains(PORT_DANGER) {
            port.dead = true;
            port.class_index = -1;
            self.staged_port = Some(port);
            return;
        }

        let Some(class_position) = rest.find(", Class ") else {
            return;
        };
        port.name = rest[..class_position].trim().to_string();

        let after_class = &rest[class_position + 8..];
        if let Some(class) = after_class
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<i32>().ok())
        {
            port.class_index = class;
        }

        // The trailing three letters carry the buy/sell combination
        if let Some(code) = rest.split_whitespace().last() {
            if code.len() == 3 && code.chars().all(|letter| letter == 'B' || letter == 'S') {
                for (slot, letter) in code.chars().enumerate() {
                    port.products[slot].buying = letter == 'B';
                }
                if port.class_index <= 0 {
                    let derived = class_index_from_string(code);
                    if port.class_index < 0 {
                        port.class_index = derived;
                    }
                }
            }
        }

        port.last_update = Utc::now().naive_utc();
        self.staged_port = Some(port);
    }

    fn push_planet(&mut self, text: &str) {
        let mut planet = Planet {
            name: text.trim().to_string(),
            ..Default::default()
        };
        if planet.name.is_empty() {
            return;
        }
        if let Some(stripped) = planet.name.strip_suffix("(Citadel)") {
            planet.citadel = true;
            planet.name = stripped.trim().to_string();
        }
        if planet.name.contains("StarDock") {
            planet.stardock = true;
        }
        self.current_sector.planets.push(planet);
    }

    /// `Traders : <name>, w/ <n> ftrs`
    pub(crate) fn begin_trader(&mut self, text: &str) {
        let mut trader = Trader::default();
        match text.split_once(", w/") {
            Some((name, rest)) => {
                trader.name = name.trim().to_string();
                trader.figs = first_int(rest);
            }
            None => trader.name = text.trim().trim_end_matches(',').to_string(),
        }
        self.current_trader = Some(trader);
    }

    /// `in <ship name> (<ship type>) with <n> ftrs` closes the trader
    fn finish_trader(&mut self, text: &str) {
        let Some(mut trader) = self.current_trader.take() else {
            return;
        };
        let body = text.trim_start_matches("in ").trim();
        match body.split_once('(') {
            Some((ship_name, rest)) => {
                trader.ship_name = ship_name.trim().trim_end_matches(',').to_string();
                if let Some((ship_type, tail)) = rest.split_once(')') {
                    trader.ship_type = ship_type.trim().to_string();
                    if tail.contains("with ") {
                        trader.figs = first_int(tail);
                    }
                }
            }
            None => trader.ship_name = body.to_string(),
        }
        self.current_sector.traders.push(trader);
    }

    /// `Fighters: <n> (<owner>) [Toll|Defensive|Offensive]`
    fn parse_fighters(&mut self, text: &str) {
        let figs = &mut self.current_sector.figs;
        figs.quantity = first_int(text);

        figs.fig_type = if text.contains("[Toll]") {
            FighterType::Toll
        } else if text.contains("[Defensive]") {
            FighterType::Defensive
        } else if text.contains("[Offensive]") {
            FighterType::Offensive
        } else {
            FighterType::None
        };

        let mut owner = text.to_string();
        // Drop the quantity token and the type tag, the rest is owner
        if let Some(first) = owner.split_whitespace().next() {
            let first = first.to_string();
            owner = owner.trim_start_matches(&first).to_string();
        }
        for tag in ["[Toll]", "[Defensive]", "[Offensive]"] {
            owner = owner.replace(tag, "");
        }
        let owner = owner
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim()
            .to_string();
        figs.owner = if owner == "Personal" {
            "yours".to_string()
        } else {
            owner
        };
    }

    /// `Mines   : <n> (Type 1 Armid) (<owner>)`
    fn parse_mines(&mut self, line: &str) {
        let parts = params(line);
        let Ok(quantity) = param_int(&parts, 3) else {
            return;
        };
        let armid = matches!(param(&parts, 6), Ok("Armid)"));
        let owner = owner_from_param(line, &parts, 7);

        let slot = if armid {
            &mut self.current_sector.mines_armid
        } else {
            &mut self.current_sector.mines_limpet
        };
        slot.quantity = quantity;
        slot.owner = owner;
    }

    /// `and <n> (Type 2 Limpet) (<owner>)` continuation
    fn parse_limpet_continuation(&mut self, trimmed: &str) {
        let parts = params(trimmed);
        let Ok(quantity) = param_int(&parts, 2) else {
            return;
        };
        let owner = owner_from_param(trimmed, &parts, 5);
        self.current_sector.mines_limpet.quantity = quantity;
        self.current_sector.mines_limpet.owner = owner;
    }

    /// `Warps to Sector(s) :  (2) - (3) - (4)` ends the block
    async fn parse_warps(&mut self, line: &str) {
        let cleaned: String = line
            .chars()
            .filter(|letter| *letter != '(' && *letter != ')')
            .collect();
        let parts = params(&cleaned);

        let mut warp = [0; 6];
        for (slot, position) in [5usize, 7, 9, 11, 13, 15].into_iter().enumerate() {
            warp[slot] = param_int(&parts, position).unwrap_or(0) as i32;
        }
        self.current_sector.warp = warp;
        self.current_sector.warps = warp.iter().take_while(|target| **target > 0).count() as i32;

        self.commit_sector().await;
    }
}

/// First integer appearing in the text, commas allowed
fn first_int(text: &str) -> i64 {
    text.split_whitespace()
        .find_map(|token| int_commas(token).ok().filter(|_| token.chars().next().is_some_and(|c| c.is_ascii_digit())))
        .unwrap_or(0)
}

/// Owner text beginning at the provided 1-based parameter position
/// with wrapping parens removed. Mines display owners after the type
/// paren, so the tail of the line from that parameter onward is the
/// owner.
fn owner_from_param(line: &str, parts: &[&str], position: usize) -> String {
    let Ok(start_token) = param(parts, position) else {
        return String::new();
    };
    let Some(offset) = line.find(start_token) else {
        return String::new();
    };
    line[offset..]
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .to_string()
}

/// Ships are displayed in two forms: the owned form
/// `<name> [Owned by] <owner>, w/ <n> ftrs, (<type>)` and the legacy
/// form `<name> (<owner>) in a Class <n> (<type>)`.
fn parse_ship(text: &str) -> Option<Ship> {
    let mut ship = Ship::default();

    if let Some((name, rest)) = text.split_once("[Owned by]") {
        ship.name = name.trim().to_string();
        let rest = rest.trim();
        match rest.split_once(", w/") {
            Some((owner, tail)) => {
                ship.owner = owner.trim().to_string();
                ship.figs = first_int(tail);
                if let Some(open) = tail.rfind('(') {
                    ship.ship_type = tail[open + 1..].trim_end_matches([')', ',']).to_string();
                }
            }
            None => ship.owner = rest.to_string(),
        }
        return Some(ship);
    }

    if text.contains(" in ") {
        let (name, rest) = text.split_once(" (")?;
        ship.name = name.trim().to_string();
        let (owner, tail) = rest.split_once(')')?;
        ship.owner = owner.trim().to_string();
        if let Some(open) = tail.rfind('(') {
            ship.ship_type = tail[open + 1..].trim_end_matches(')').to_string();
        }
        return Some(ship);
    }

    None
}

#[cfg(test)]
mod test {
    use super::parse_ship;

    #[test]
    fn test_parse_owned_ship() {
        let ship = parse_ship("Dauntless [Owned by] Harkonnen, w/ 1,500 ftrs, (Merchant Cruiser)")
            .unwrap();
        assert_eq!(ship.name, "Dauntless");
        assert_eq!(ship.owner, "Harkonnen");
        assert_eq!(ship.figs, 1500);
        assert_eq!(ship.ship_type, "Merchant Cruiser");
    }

    #[test]
    fn test_parse_legacy_ship() {
        let ship = parse_ship("Nomad (Vagabond) in a Class 2 (Scout Marauder)").unwrap();
        assert_eq!(ship.name, "Nomad");
        assert_eq!(ship.owner, "Vagabond");
        assert_eq!(ship.ship_type, "Scout Marauder");
    }

    #[test]
    fn test_unrecognized_ship_ignored() {
        assert!(parse_ship("static on the scanner").is_none());
    }
}
