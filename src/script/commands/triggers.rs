//! Trigger commands. Triggers registered here belong to the running
//! script and die with it.

use super::{label_value, number_value, text_value};
use crate::script::ast::Expr;
use crate::script::triggers::TriggerKind;
use crate::script::vm::{ScriptHost, Vm};
use crate::script::ScriptResult;
use chrono::Duration;

/// `setTextLineTrigger <id> <pattern> <label> [<lifecycle>]` and the
/// text/text-out/event variants
pub(super) fn set_trigger(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
    kind: TriggerKind,
) -> ScriptResult<()> {
    let id = text_value(vm, host, params, 0)?;
    let pattern = text_value(vm, host, params, 1)?;
    let label = label_value(vm, host, params, 2)?;
    let lifecycle = if params.len() > 3 {
        Some(number_value(vm, host, params, 3)? as i32)
    } else {
        None
    };

    host.triggers.add(
        Some(id),
        kind,
        pattern,
        label,
        String::new(),
        lifecycle,
        host.script_id,
        None,
    );
    Ok(())
}

/// `setDelayTrigger <id> <label> <millis>`
pub(super) fn set_delay_trigger(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let id = text_value(vm, host, params, 0)?;
    let label = label_value(vm, host, params, 1)?;
    let millis = number_value(vm, host, params, 2)? as i64;

    host.triggers.add(
        Some(id),
        TriggerKind::Delay,
        String::new(),
        label,
        String::new(),
        None,
        host.script_id,
        Some(Duration::milliseconds(millis)),
    );
    Ok(())
}

/// `killTrigger <id>`
pub(super) fn kill_trigger(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let id = text_value(vm, host, params, 0)?;
    host.triggers.remove(&id);
    Ok(())
}

/// `killAllTriggers` drops every trigger owned by this script
pub(super) fn kill_all_triggers(
    _vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    _params: &[Expr],
) -> ScriptResult<()> {
    host.triggers.remove_by_script(host.script_id);
    Ok(())
}
