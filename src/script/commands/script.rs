//! Script management commands. Anything touching the script registry
//! is queued as an engine op so the registry is never mutated while a
//! VM inside it is stepping.

use super::{number_value, text_value, var_target};
use crate::script::ast::Expr;
use crate::script::vm::{EngineOp, ScriptHost, Vm};
use crate::script::{ScriptError, ScriptResult};

/// `load <path>` loads another script
pub(super) fn load(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let path = text_value(vm, host, params, 0)?;
    host.ops.push(EngineOp::LoadScript(path));
    Ok(())
}

/// `stop [<name>]` stops a script by name, or the calling script
pub(super) fn stop(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let name = if params.is_empty() {
        None
    } else {
        Some(text_value(vm, host, params, 0)?)
    };
    host.ops.push(EngineOp::StopScript(name));
    Ok(())
}

/// `stopAll` stops every non-system script
pub(super) fn stop_all(
    _vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    _params: &[Expr],
) -> ScriptResult<()> {
    host.ops.push(EngineOp::StopAll);
    Ok(())
}

/// `systemScript` marks the calling script as a system script so it
/// survives stopAll
pub(super) fn system_script(
    _vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    _params: &[Expr],
) -> ScriptResult<()> {
    host.ops.push(EngineOp::MarkSystem);
    Ok(())
}

/// `listActiveScripts [$var]` stores the active script names newline
/// separated, or echoes them when no variable is given
pub(super) fn list_active_scripts(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let listing = host.active_scripts.join("\n");
    if params.is_empty() {
        host.events.data(format!("\r\n{listing}\r\n").as_bytes());
        return Ok(());
    }
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(&base, &indexes, &listing)
}

/// `getScriptVersion $var`
pub(super) fn get_script_version(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let version = host.version.to_string();
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(&base, &indexes, &version)
}

/// `reqVersion <number>` halts with a diagnostic when the runtime is
/// older than the script requires
pub(super) fn req_version(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let required = number_value(vm, host, params, 0)? as i32;
    if host.version < required {
        return Err(ScriptError::runtime(format!(
            "script requires language version {required}, runtime is {}",
            host.version
        )));
    }
    Ok(())
}
