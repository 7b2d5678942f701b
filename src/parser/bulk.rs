//! Warp lane, density scan and deployed fighter scan displays.

use super::{FigScanType, GameParser};
use crate::database::entities::{ExploredLevel, FighterType};
use crate::game::models::SectorData;
use crate::utils::parsing::{int_commas, param_int, params};
use crate::utils::types::SectorIndex;
use log::warn;

impl GameParser {
    /// Plotted course lines: sector numbers joined by `>`. Consecutive
    /// pairs record the warp in both directions; the final sector
    /// carries over so multi-line paths link up.
    pub(crate) async fn process_warp_line(&mut self, line: &str) {
        let cleaned: String = line
            .chars()
            .filter(|letter| *letter != '(' && *letter != ')')
            .collect();

        let mut previous = self.last_warp;
        for token in cleaned.split('>') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let Ok(sector) = token.parse::<SectorIndex>() else {
                return;
            };
            if sector <= 0 {
                return;
            }
            if previous > 0 {
                self.add_warp_pair(previous, sector).await;
            }
            previous = sector;
        }
        self.last_warp = previous;
    }

    /// Records `from → to` and `to → from`
    async fn add_warp_pair(&mut self, from: SectorIndex, to: SectorIndex) {
        self.add_one_way_warp(from, to).await;
        self.add_one_way_warp(to, from).await;
    }

    async fn add_one_way_warp(&mut self, from: SectorIndex, to: SectorIndex) {
        let mut sector = match self.store().load_sector(from).await {
            Ok(Some(sector)) => sector,
            Ok(None) => SectorData::new(from),
            Err(err) => {
                warn!("Failed loading sector {from}: {err}");
                return;
            }
        };
        if sector.warp.contains(&to) {
            return;
        }
        sector.add_warp(to);
        if let Err(err) = self.store().save_sector(&sector).await {
            warn!("Failed saving sector {from}: {err}");
        }
    }

    /// `Sector (42) :    1,200  (3 warps)  5% Navhaz  Anomaly: Yes`
    pub(crate) async fn process_density_line(&mut self, line: &str) {
        if !line.trim_start().starts_with("Sector ") {
            return;
        }
        let cleaned: String = line
            .chars()
            .filter(|letter| *letter != '(' && *letter != ')')
            .collect();
        let parts = params(&cleaned);

        let Ok(index) = param_int(&parts, 2) else {
            return;
        };
        let index = index as SectorIndex;
        if index <= 0 {
            return;
        }
        let Ok(density) = param_int(&parts, 4) else {
            return;
        };

        // Warp count sits just before the literal `warps` marker; the
        // older display shape prints it after a `Warps :` label instead
        let warps = parts
            .iter()
            .position(|token| token.eq_ignore_ascii_case("warps"))
            .and_then(|position| {
                parts
                    .get(position.wrapping_sub(1))
                    .filter(|_| position >= 1 && position != 4)
                    .and_then(|value| int_commas(value).ok())
                    .or_else(|| parts.get(position + 2).and_then(|value| int_commas(value).ok()))
            })
            .unwrap_or(0);

        let nav_haz = parts
            .iter()
            .find(|token| token.ends_with('%'))
            .and_then(|token| int_commas(token).ok())
            .unwrap_or(0);

        let anomaly = parts
            .last()
            .map(|token| token.eq_ignore_ascii_case("Yes"))
            .unwrap_or(false);

        let mut sector = match self.store().load_sector(index).await {
            Ok(Some(sector)) => sector,
            Ok(None) => SectorData::new(index),
            Err(err) => {
                warn!("Failed loading sector {index}: {err}");
                return;
            }
        };

        sector.density = density;
        sector.warps = warps as i32;
        sector.nav_haz = nav_haz as i32;
        sector.anomaly = anomaly;
        if matches!(
            sector.explored,
            ExploredLevel::NotVisited | ExploredLevel::Calc
        ) {
            sector.explored = ExploredLevel::Density;
            sector.constellation = "??? (Density only)".to_string();
        }

        if let Err(err) = self.store().save_sector(&sector).await {
            warn!("Failed saving sector {index}: {err}");
        }
    }

    /// Deployed fighter scan rows: sector, quantity and fighter mode.
    /// The report header names whose fighters are listed.
    pub(crate) async fn process_fig_scan_line(&mut self, line: &str) {
        let trimmed = line.trim();
        // Data rows lead with a sector number; anything else is header
        // text that names whose fighters are listed
        if !trimmed.chars().next().is_some_and(|letter| letter.is_ascii_digit()) {
            if trimmed.contains("Personal") {
                self.fig_scan_type = FigScanType::Personal;
            } else if trimmed.contains("Corp") {
                self.fig_scan_type = FigScanType::Corp;
            }
            return;
        }

        let parts = params(trimmed);
        let Ok(index) = param_int(&parts, 1) else {
            return;
        };
        let index = index as SectorIndex;
        if index <= 0 {
            return;
        }
        let Ok(quantity) = param_int(&parts, 2) else {
            return;
        };

        let fig_type = match parts.last() {
            Some(&"Defensive") => FighterType::Defensive,
            Some(&"Offensive") => FighterType::Offensive,
            Some(&"Toll") => FighterType::Toll,
            _ => FighterType::None,
        };

        let mut sector = match self.store().load_sector(index).await {
            Ok(Some(sector)) => sector,
            Ok(None) => SectorData::new(index),
            Err(err) => {
                warn!("Failed loading sector {index}: {err}");
                return;
            }
        };

        sector.figs.quantity = quantity;
        sector.figs.fig_type = fig_type;
        sector.figs.owner = match self.fig_scan_type {
            FigScanType::Personal => "yours".to_string(),
            FigScanType::Corp => "belong to your Corp".to_string(),
        };

        if let Err(err) = self.store().save_sector(&sector).await {
            warn!("Failed saving sector {index}: {err}");
        }
    }
}
