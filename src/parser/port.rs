//! Commerce report and port CIM handling. Three product rows terminate
//! a commerce report and finalize the staged port.

use super::{Display, GameParser};
use crate::database::entities::ExploredLevel;
use crate::game::models::{class_index_from_flags, PortData, Product, SectorData};
use crate::utils::parsing::{int_commas, params};
use crate::utils::types::SectorIndex;
use chrono::Utc;
use log::warn;

impl GameParser {
    pub(crate) async fn process_port_line(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("Commerce report for ") {
            if let Some(colon) = rest.find(':') {
                self.current_port.name = rest[..colon].trim().to_string();
            }
            self.product_rows = 0;
            return;
        }

        let product = if line.starts_with("Fuel Ore") {
            Product::FuelOre
        } else if line.starts_with("Organics") {
            Product::Organics
        } else if line.starts_with("Equipment") {
            Product::Equipment
        } else {
            return;
        };
        if !line.contains('%') {
            return;
        }

        // `Fuel Ore` spans two whitespace parameters
        let skip = if product == Product::FuelOre { 2 } else { 1 };
        let parts = params(line);
        let mut values = parts.iter().skip(skip);

        let buying = matches!(values.next(), Some(&"Buying"));
        let quantity = values.next().and_then(|value| int_commas(value).ok());
        let percent = values.next().and_then(|value| int_commas(value).ok());
        let (Some(quantity), Some(percent)) = (quantity, percent) else {
            return;
        };

        let slot = self.current_port.product_mut(product);
        slot.buying = buying;
        slot.amount = quantity;
        slot.percent = percent as i32;

        self.product_rows += 1;
        if self.product_rows >= 3 {
            self.finalize_port().await;
        }
    }

    /// Runs once the third product row has been parsed
    async fn finalize_port(&mut self) {
        self.product_rows = 0;

        let mut port = self.current_port.clone();
        port.last_update = Utc::now().naive_utc();
        if port.class_index <= 0 {
            port.class_index = class_index_from_flags(port.buy_flags());
        }
        if port.sector_index <= 0 {
            warn!("Commerce report finished without a known sector, dropped");
            return;
        }

        self.mark_sector_calc(port.sector_index, "??? (port data/calc only)")
            .await;
        self.commit_port(&port).await;
        self.current_port = port;
    }

    /// Marks an unvisited sector as known through calculation only
    pub(crate) async fn mark_sector_calc(&mut self, index: SectorIndex, constellation: &str) {
        let sector = match self.store().load_sector(index).await {
            Ok(sector) => sector,
            Err(err) => {
                warn!("Failed loading sector {index}: {err}");
                return;
            }
        };
        let mut sector = sector.unwrap_or_else(|| SectorData::new(index));
        if sector.explored != ExploredLevel::NotVisited {
            return;
        }
        sector.explored = ExploredLevel::Calc;
        sector.constellation = constellation.to_string();
        if let Err(err) = self.store().save_sector(&sector).await {
            warn!("Failed saving sector {index}: {err}");
        }
    }

    /// Rows inside the Computer Information Matrix. The header does not
    /// say which dump was requested, so the first data row decides:
    /// port rows end in a percentage, warp rows do not.
    pub(crate) async fn process_cim_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return;
        }

        if self.display() == Display::Cim {
            self.set_display(if trimmed.ends_with('%') {
                Display::PortCim
            } else {
                Display::WarpCim
            });
        }

        match self.display() {
            Display::PortCim => self.process_port_cim_row(trimmed).await,
            Display::WarpCim => self.process_warp_cim_row(trimmed).await,
            _ => {}
        }
    }

    /// `<sector>  [-] <amount> <pct>%  [-] <amount> <pct>%  [-] <amount> <pct>%`
    /// where a leading `-` marks a product the port buys
    async fn process_port_cim_row(&mut self, row: &str) {
        let parts = params(row);
        let mut tokens = parts.iter();
        let Some(sector) = tokens.next().and_then(|value| int_commas(value).ok()) else {
            return;
        };
        let sector = sector as SectorIndex;
        if sector <= 0 {
            return;
        }

        let mut port = match self.store().load_port(sector).await {
            Ok(Some(port)) => port,
            Ok(None) => PortData::new(sector),
            Err(err) => {
                warn!("Failed loading port {sector}: {err}");
                return;
            }
        };

        for product in Product::ALL {
            let mut token = match tokens.next() {
                Some(token) => *token,
                None => return,
            };
            let buying = token == "-";
            if buying {
                token = match tokens.next() {
                    Some(token) => *token,
                    None => return,
                };
            }
            let Ok(amount) = int_commas(token) else {
                return;
            };
            let Some(percent) = tokens.next().and_then(|value| int_commas(value).ok()) else {
                return;
            };

            let slot = port.product_mut(product);
            slot.buying = buying;
            slot.amount = amount;
            slot.percent = percent as i32;
        }

        port.last_update = Utc::now().naive_utc();
        if port.class_index <= 0 {
            port.class_index = class_index_from_flags(port.buy_flags());
        }

        self.mark_sector_calc(sector, "??? (port data/calc only)").await;
        self.commit_port(&port).await;
    }

    /// `<sector>  <warp> <warp> ...` replaces the sector's warp slots
    async fn process_warp_cim_row(&mut self, row: &str) {
        let parts = params(row);
        let mut tokens = parts.iter();
        let Some(sector) = tokens.next().and_then(|value| int_commas(value).ok()) else {
            return;
        };
        let sector = sector as SectorIndex;
        if sector <= 0 {
            return;
        }

        let mut data = match self.store().load_sector(sector).await {
            Ok(Some(data)) => data,
            Ok(None) => SectorData::new(sector),
            Err(err) => {
                warn!("Failed loading sector {sector}: {err}");
                return;
            }
        };

        data.warp = [0; 6];
        for (slot, token) in tokens.take(6).enumerate() {
            let Ok(target) = int_commas(token) else {
                return;
            };
            data.warp[slot] = target as SectorIndex;
        }
        data.warps = data.count_warps();

        if let Err(err) = self.store().save_sector(&data).await {
            warn!("Failed saving sector {sector}: {err}");
        }
    }
}
