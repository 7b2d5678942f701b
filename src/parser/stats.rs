//! Quick-stats mining and message history capture.

use super::{GameParser, PendingTransmission};
use crate::database::entities::MessageKind;
use crate::utils::parsing::int_commas;
use crate::utils::types::SectorIndex;
use log::warn;

impl GameParser {
    /// The one line quick-stats display: `Sect 123│Turns 1,600│...`.
    /// Each segment is a short key and value; unknown keys are ignored
    /// so newer game builds don't break mining.
    pub(crate) async fn mine_quick_stats(&mut self, line: &str) {
        if !line.starts_with("Sect ") || !(line.contains('│') || line.contains('|')) {
            return;
        }

        let mut stats = match self.store().load_player_stats().await {
            Ok(stats) => stats.unwrap_or_default(),
            Err(err) => {
                warn!("Failed loading player stats: {err}");
                return;
            }
        };

        let mut sector: SectorIndex = 0;
        for segment in line.split(['│', '|']) {
            let Some((key, value)) = segment.trim().split_once(' ') else {
                continue;
            };
            let value = value.trim();
            let number = int_commas(value).unwrap_or(0);
            match key {
                "Sect" => sector = number as SectorIndex,
                "Turns" => stats.turns = number,
                "Creds" => stats.credits = number,
                "Figs" => stats.fighters = number,
                "Shlds" => stats.shields = number,
                "Hlds" => stats.total_holds = number,
                "Ore" => stats.ore_holds = number,
                "Org" => stats.org_holds = number,
                "Equ" => stats.equ_holds = number,
                "Col" => stats.col_holds = number,
                "Phot" => stats.photons = number,
                "Armd" => stats.armids = number,
                "Lmpt" => stats.limpets = number,
                "GTorp" => stats.gen_torps = number,
                "TWarp" => stats.twarp_type = if value == "No" { 0 } else { number as i32 },
                "Clks" => stats.cloaks = number,
                "Beacns" => stats.beacons = number,
                "AtmDt" => stats.atomics = number,
                "Crbo" => stats.corbomite = number,
                "EPrb" => stats.eprobes = number,
                "MDis" => stats.mine_disrs = number,
                "Aln" => stats.alignment = number,
                "Exp" => stats.experience = number,
                "Corp" => stats.corp = number as i32,
                "PsPrb" => stats.psychic_probe = value == "Yes",
                "PlScn" => stats.planet_scanner = value == "Yes",
                "LRS" => {
                    stats.long_range_scanner = match value {
                        "Dens" => 1,
                        "Holo" => 2,
                        _ => 0,
                    }
                }
                "Ship" => {
                    let mut pieces = value.split_whitespace();
                    stats.ship_number = pieces
                        .next()
                        .and_then(|number| number.parse().ok())
                        .unwrap_or(0);
                    stats.ship_class = pieces.collect::<Vec<_>>().join(" ");
                }
                _ => {}
            }
        }

        stats.empty_holds = (stats.total_holds
            - stats.ore_holds
            - stats.org_holds
            - stats.equ_holds
            - stats.col_holds)
            .max(0);
        if sector > 0 {
            stats.current_sector = sector;
        }

        if let Err(err) = self.store().save_player_stats(stats.clone()).await {
            warn!("Failed saving player stats: {err}");
            return;
        }
        self.events().player_stats_updated(&stats);

        if sector > 0 {
            self.set_current_sector(sector).await;
        }
    }

    /// Radio, Fedlink and fighter report capture. Transmission headers
    /// name the sender; the following line carries the content.
    pub(crate) async fn mine_messages(&mut self, line: &str) {
        if let Some(rest) = line
            .strip_prefix("Incoming transmission from ")
            .or_else(|| line.strip_prefix("Continuing transmission from "))
        {
            self.pending_transmission = Some(parse_transmission_header(rest));
            return;
        }

        if let Some(pending) = self.pending_transmission.take() {
            let content = line.trim();
            if content.is_empty() {
                self.pending_transmission = Some(pending);
            } else {
                self.append_message(pending.kind, content, &pending.sender, &pending.channel)
                    .await;
            }
            return;
        }

        if line.starts_with("Deployed Fighters Report Sector") {
            self.append_message(MessageKind::Fighter, line.trim(), "", "")
                .await;
        }
    }

    pub(crate) async fn append_message(
        &self,
        kind: MessageKind,
        content: &str,
        sender: &str,
        channel: &str,
    ) {
        if let Err(err) = self
            .store()
            .add_message(kind, content, sender, channel)
            .await
        {
            warn!("Failed appending message history: {err}");
        }
    }
}

fn parse_transmission_header(rest: &str) -> PendingTransmission {
    let rest = rest.trim_end_matches(':').trim();

    if let Some((sender, channel)) = rest.split_once(" on channel ") {
        return PendingTransmission {
            kind: MessageKind::Radio,
            sender: sender.trim().to_string(),
            channel: channel.trim().to_string(),
        };
    }

    if let Some((sender, _)) = rest.split_once(" on Federation comm-link") {
        return PendingTransmission {
            kind: MessageKind::Fedlink,
            sender: sender.trim().to_string(),
            channel: String::new(),
        };
    }

    PendingTransmission {
        kind: MessageKind::General,
        sender: rest.to_string(),
        channel: String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::parse_transmission_header;
    use crate::database::entities::MessageKind;

    #[test]
    fn test_radio_header() {
        let pending = parse_transmission_header("Gypsy on channel 90210:");
        assert_eq!(pending.kind, MessageKind::Radio);
        assert_eq!(pending.sender, "Gypsy");
        assert_eq!(pending.channel, "90210");
    }

    #[test]
    fn test_fedlink_header() {
        let pending = parse_transmission_header("Captain Zyrain on Federation comm-link:");
        assert_eq!(pending.kind, MessageKind::Fedlink);
        assert_eq!(pending.sender, "Captain Zyrain");
    }

    #[test]
    fn test_plain_hail() {
        let pending = parse_transmission_header("Dorsai:");
        assert_eq!(pending.kind, MessageKind::General);
        assert_eq!(pending.sender, "Dorsai");
    }
}
