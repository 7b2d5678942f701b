//! Game data access. Scripts read the universe through the parser's
//! store; they never write game records other than sector variables.

use super::{number_value, text_value, var_target};
use crate::database::entities::{ExploredLevel, FighterType};
use crate::script::ast::Expr;
use crate::script::vm::{ScriptHost, Vm};
use crate::script::{ScriptError, ScriptResult};
use crate::utils::types::SectorIndex;

/// `getSector <index> $var` fills `$var` with the sector's fields as
/// array children (`$var.density` style access reads `$var[density]`)
pub(super) async fn get_sector(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let index = number_value(vm, host, params, 0)? as SectorIndex;
    if index < 1 {
        return Err(ScriptError::runtime(format!("bad sector index {index}")));
    }
    let (base, prefix) = var_target(vm, host, params, 1)?;

    let sector = host
        .store
        .load_sector(index)
        .await?
        .unwrap_or_else(|| crate::game::models::SectorData::new(index));
    let port = host.store.load_port(index).await?;

    let mut set = |key: &[&str], value: String| -> ScriptResult<()> {
        let mut indexes = prefix.clone();
        indexes.extend(key.iter().map(|part| part.to_string()));
        vm.vars.set(&base, &indexes, &value)
    };

    set(&["INDEX"], index.to_string())?;
    set(
        &["EXPLORED"],
        match sector.explored {
            ExploredLevel::NotVisited => "NO",
            ExploredLevel::Calc => "CALC",
            ExploredLevel::Density => "DENSITY",
            ExploredLevel::Holo => "YES",
        }
        .to_string(),
    )?;
    set(&["DENSITY"], sector.density.to_string())?;
    set(&["NAVHAZ"], sector.nav_haz.to_string())?;
    set(&["ANOMALY"], if sector.anomaly { "1" } else { "0" }.to_string())?;
    set(&["CONSTELLATION"], sector.constellation.clone())?;
    set(&["BEACON"], sector.beacon.clone())?;
    set(&["WARPS"], sector.warps.to_string())?;
    for (slot, target) in sector.warp.iter().enumerate() {
        set(&["WARP", &(slot + 1).to_string()], target.to_string())?;
    }
    set(&["FIGS", "QUANTITY"], sector.figs.quantity.to_string())?;
    set(&["FIGS", "OWNER"], sector.figs.owner.clone())?;
    set(
        &["FIGS", "TYPE"],
        match sector.figs.fig_type {
            FighterType::None => "NONE",
            FighterType::Toll => "TOLL",
            FighterType::Defensive => "DEFENSIVE",
            FighterType::Offensive => "OFFENSIVE",
        }
        .to_string(),
    )?;
    set(&["SHIPS"], sector.ships.len().to_string())?;
    set(&["TRADERS"], sector.traders.len().to_string())?;
    set(&["PLANETS"], sector.planets.len().to_string())?;

    match port {
        Some(port) => {
            set(&["PORT", "EXISTS"], "1".to_string())?;
            set(&["PORT", "NAME"], port.name.clone())?;
            set(&["PORT", "CLASS"], port.class_index.to_string())?;
            set(&["PORT", "BUILDTIME"], port.build_time.to_string())?;
            set(&["PORT", "DEAD"], if port.dead { "1" } else { "0" }.to_string())?;
        }
        None => {
            set(&["PORT", "EXISTS"], "0".to_string())?;
            set(&["PORT", "CLASS"], "0".to_string())?;
        }
    }

    Ok(())
}

/// `getSectorParameter <index> <name> $result`
pub(super) async fn get_sector_parameter(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let index = number_value(vm, host, params, 0)? as SectorIndex;
    let name = text_value(vm, host, params, 1)?;
    let value = host
        .store
        .get_sector_var(index, &name)
        .await?
        .unwrap_or_default();
    let (base, indexes) = var_target(vm, host, params, 2)?;
    vm.vars.set(&base, &indexes, &value)
}

/// `setSectorParameter <index> <name> <value>`
pub(super) async fn set_sector_parameter(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let index = number_value(vm, host, params, 0)? as SectorIndex;
    let name = text_value(vm, host, params, 1)?;
    let value = text_value(vm, host, params, 2)?;
    host.store.set_sector_var(index, &name, &value).await?;
    Ok(())
}
