//! I/O commands: transport writes, terminal echo and the suspension
//! commands that park the VM on external input.

use super::{joined_text, text_value, var_target};
use crate::script::ast::Expr;
use crate::script::vm::{ScriptHost, Vm, VmState};
use crate::script::ScriptResult;

/// `send <value>...` queues text for the game server. The engine runs
/// outbound triggers over it before it reaches the transport.
pub(super) fn send(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let out = joined_text(vm, host, params)?;
    host.outbound.push(out);
    Ok(())
}

/// `echo <value>...` prints to the local terminal
pub(super) fn echo(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let out = joined_text(vm, host, params)?;
    host.events.data(out.as_bytes());
    Ok(())
}

/// `clientMessage <value>` prints to the terminal set off on its own
/// line so it reads as a proxy message rather than game output
pub(super) fn client_message(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let out = text_value(vm, host, params, 0)?;
    host.events.data(format!("\r\n{out}\r\n").as_bytes());
    Ok(())
}

/// `waitFor <value>` parks the VM until a matching line arrives
pub(super) fn wait_for(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let wait = text_value(vm, host, params, 0)?;
    vm.wait_text = Some(wait);
    vm.state = VmState::Waiting;
    Ok(())
}

/// `getInput $var [<prompt>]` parks the VM until the user submits a
/// line through the terminal
pub(super) fn get_input(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    if params.len() > 1 {
        let prompt = text_value(vm, host, params, 1)?;
        host.events.data(format!("\r\n{prompt}").as_bytes());
    }
    let target = var_target(vm, host, params, 0)?;
    vm.input_target = Some(target);
    vm.state = VmState::WaitingInput;
    Ok(())
}

/// `getConsoleInput $var` like getInput without a prompt
pub(super) fn get_console_input(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let target = var_target(vm, host, params, 0)?;
    vm.input_target = Some(target);
    vm.state = VmState::WaitingInput;
    Ok(())
}
