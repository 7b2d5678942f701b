//! Command registry and dispatch. Every command carries its arity and
//! which parameters must be variable references; the table is checked
//! at assembly so runtime dispatch never revalidates shape.

mod game;
mod io;
mod script;
mod text;
mod triggers;
mod vars;

use super::ast::Expr;
use super::value::Value;
use super::vm::{ScriptHost, Vm, VmState};
use super::{ScriptError, ScriptResult};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOp {
    // Control flow (GOTO and BRANCH lower to instructions)
    Gosub,
    Return,
    Halt,
    Pause,
    // Variables
    SetVar,
    SetArray,
    ClearArray,
    ArraySize,
    SetArrayElement,
    GetArrayElement,
    LoadVar,
    SaveVar,
    // I/O
    Send,
    Echo,
    ClientMessage,
    WaitFor,
    GetInput,
    GetConsoleInput,
    // Triggers
    SetTextLineTrigger,
    SetTextTrigger,
    SetTextOutTrigger,
    SetEventTrigger,
    SetDelayTrigger,
    KillTrigger,
    KillAllTriggers,
    // Script management
    Load,
    Stop,
    StopAll,
    SystemScript,
    ListActiveScripts,
    GetScriptVersion,
    ReqVersion,
    // Text and math
    Add,
    Subtract,
    Multiply,
    Divide,
    MergeText,
    CutText,
    GetWord,
    GetWordCount,
    StripText,
    ReplaceText,
    UpperCase,
    LowerCase,
    GetLength,
    IsNumber,
    Round,
    Random,
    GetDate,
    GetTime,
    GetDateTime,
    // Game data
    GetSector,
    GetSectorParameter,
    SetSectorParameter,
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub op: CommandOp,
    pub min: usize,
    pub max: usize,
    /// Parameter positions that must be variable references
    pub var_params: &'static [usize],
}

const fn spec(
    name: &'static str,
    op: CommandOp,
    min: usize,
    max: usize,
    var_params: &'static [usize],
) -> CommandSpec {
    CommandSpec {
        name,
        op,
        min,
        max,
        var_params,
    }
}

static COMMANDS: &[CommandSpec] = &[
    spec("GOSUB", CommandOp::Gosub, 1, 1, &[]),
    spec("RETURN", CommandOp::Return, 0, 0, &[]),
    spec("HALT", CommandOp::Halt, 0, 0, &[]),
    spec("PAUSE", CommandOp::Pause, 0, 0, &[]),
    spec("SETVAR", CommandOp::SetVar, 2, 2, &[0]),
    spec("SETARRAY", CommandOp::SetArray, 2, 7, &[0]),
    spec("ARRAY", CommandOp::SetArray, 2, 7, &[0]),
    spec("CLEARARRAY", CommandOp::ClearArray, 1, 1, &[0]),
    spec("ARRAYSIZE", CommandOp::ArraySize, 2, 2, &[0, 1]),
    spec("SETARRAYELEMENT", CommandOp::SetArrayElement, 3, 3, &[0]),
    spec("GETARRAYELEMENT", CommandOp::GetArrayElement, 3, 3, &[0, 1]),
    spec("LOADVAR", CommandOp::LoadVar, 1, 1, &[0]),
    spec("SAVEVAR", CommandOp::SaveVar, 1, 1, &[0]),
    spec("SEND", CommandOp::Send, 1, 8, &[]),
    spec("ECHO", CommandOp::Echo, 1, 8, &[]),
    spec("CLIENTMESSAGE", CommandOp::ClientMessage, 1, 1, &[]),
    spec("WAITFOR", CommandOp::WaitFor, 1, 1, &[]),
    spec("GETINPUT", CommandOp::GetInput, 1, 2, &[0]),
    spec("GETCONSOLEINPUT", CommandOp::GetConsoleInput, 1, 1, &[0]),
    spec("SETTEXTLINETRIGGER", CommandOp::SetTextLineTrigger, 3, 4, &[]),
    spec("SETTEXTTRIGGER", CommandOp::SetTextTrigger, 3, 4, &[]),
    spec("SETTEXTOUTTRIGGER", CommandOp::SetTextOutTrigger, 3, 4, &[]),
    spec("SETEVENTTRIGGER", CommandOp::SetEventTrigger, 3, 4, &[]),
    spec("SETDELAYTRIGGER", CommandOp::SetDelayTrigger, 3, 3, &[]),
    spec("KILLTRIGGER", CommandOp::KillTrigger, 1, 1, &[]),
    spec("KILLALLTRIGGERS", CommandOp::KillAllTriggers, 0, 0, &[]),
    spec("LOAD", CommandOp::Load, 1, 1, &[]),
    spec("STOP", CommandOp::Stop, 0, 1, &[]),
    spec("STOPALL", CommandOp::StopAll, 0, 0, &[]),
    spec("SYSTEMSCRIPT", CommandOp::SystemScript, 0, 0, &[]),
    spec("LISTACTIVESCRIPTS", CommandOp::ListActiveScripts, 0, 1, &[0]),
    spec("GETSCRIPTVERSION", CommandOp::GetScriptVersion, 1, 1, &[0]),
    spec("REQVERSION", CommandOp::ReqVersion, 1, 1, &[]),
    spec("ADD", CommandOp::Add, 2, 2, &[0]),
    spec("SUBTRACT", CommandOp::Subtract, 2, 2, &[0]),
    spec("MULTIPLY", CommandOp::Multiply, 2, 2, &[0]),
    spec("DIVIDE", CommandOp::Divide, 2, 2, &[0]),
    spec("MERGETEXT", CommandOp::MergeText, 3, 3, &[2]),
    spec("CUTTEXT", CommandOp::CutText, 4, 4, &[1]),
    spec("GETWORD", CommandOp::GetWord, 3, 4, &[1]),
    spec("GETWORDCOUNT", CommandOp::GetWordCount, 2, 2, &[1]),
    spec("STRIPTEXT", CommandOp::StripText, 2, 2, &[0]),
    spec("REPLACETEXT", CommandOp::ReplaceText, 3, 3, &[0]),
    spec("UPPERCASE", CommandOp::UpperCase, 1, 1, &[0]),
    spec("LOWERCASE", CommandOp::LowerCase, 1, 1, &[0]),
    spec("GETLENGTH", CommandOp::GetLength, 2, 2, &[1]),
    spec("ISNUMBER", CommandOp::IsNumber, 2, 2, &[0]),
    spec("ROUND", CommandOp::Round, 1, 2, &[0]),
    spec("RANDOM", CommandOp::Random, 2, 2, &[0]),
    spec("GETDATE", CommandOp::GetDate, 1, 1, &[0]),
    spec("GETTIME", CommandOp::GetTime, 1, 1, &[0]),
    spec("GETDATETIME", CommandOp::GetDateTime, 1, 1, &[0]),
    spec("GETSECTOR", CommandOp::GetSector, 2, 2, &[1]),
    spec("GETSECTORPARAMETER", CommandOp::GetSectorParameter, 3, 3, &[2]),
    spec("SETSECTORPARAMETER", CommandOp::SetSectorParameter, 3, 3, &[]),
];

/// Case-insensitive command lookup
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    static INDEX: OnceLock<HashMap<&'static str, &'static CommandSpec>> = OnceLock::new();
    let index = INDEX.get_or_init(|| {
        COMMANDS
            .iter()
            .map(|spec| (spec.name, spec))
            .collect::<HashMap<_, _>>()
    });
    index.get(name.to_ascii_uppercase().as_str()).copied()
}

/// Dispatches one command invocation
pub async fn execute(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    op: CommandOp,
    params: &[Expr],
) -> ScriptResult<()> {
    match op {
        CommandOp::Gosub => {
            let label = label_value(vm, host, params, 0)?;
            let return_pc = vm.pc;
            vm.jump(&label)?;
            vm.call_stack.push(super::vm::Frame {
                label,
                saved_pc: return_pc.saturating_sub(1),
                return_pc,
            });
            Ok(())
        }
        CommandOp::Return => {
            let frame = vm
                .call_stack
                .pop()
                .ok_or_else(|| ScriptError::runtime("RETURN without GOSUB"))?;
            vm.pc = frame.return_pc;
            Ok(())
        }
        CommandOp::Halt => {
            vm.state = VmState::Halted;
            Ok(())
        }
        CommandOp::Pause => {
            // Checkpoint semantics: parked until an external resume
            vm.state = VmState::Paused;
            Ok(())
        }

        CommandOp::SetVar => vars::set_var(vm, host, params),
        CommandOp::SetArray => vars::set_array(vm, host, params),
        CommandOp::ClearArray => vars::clear_array(vm, host, params),
        CommandOp::ArraySize => vars::array_size(vm, host, params),
        CommandOp::SetArrayElement => vars::set_array_element(vm, host, params),
        CommandOp::GetArrayElement => vars::get_array_element(vm, host, params),
        CommandOp::LoadVar => vars::load_var(vm, host, params).await,
        CommandOp::SaveVar => vars::save_var(vm, host, params).await,

        CommandOp::Send => io::send(vm, host, params),
        CommandOp::Echo => io::echo(vm, host, params),
        CommandOp::ClientMessage => io::client_message(vm, host, params),
        CommandOp::WaitFor => io::wait_for(vm, host, params),
        CommandOp::GetInput => io::get_input(vm, host, params),
        CommandOp::GetConsoleInput => io::get_console_input(vm, host, params),

        CommandOp::SetTextLineTrigger => {
            triggers::set_trigger(vm, host, params, super::triggers::TriggerKind::TextLine)
        }
        CommandOp::SetTextTrigger => {
            triggers::set_trigger(vm, host, params, super::triggers::TriggerKind::Text)
        }
        CommandOp::SetTextOutTrigger => {
            triggers::set_trigger(vm, host, params, super::triggers::TriggerKind::TextOut)
        }
        CommandOp::SetEventTrigger => {
            triggers::set_trigger(vm, host, params, super::triggers::TriggerKind::Event)
        }
        CommandOp::SetDelayTrigger => triggers::set_delay_trigger(vm, host, params),
        CommandOp::KillTrigger => triggers::kill_trigger(vm, host, params),
        CommandOp::KillAllTriggers => triggers::kill_all_triggers(vm, host, params),

        CommandOp::Load => script::load(vm, host, params),
        CommandOp::Stop => script::stop(vm, host, params),
        CommandOp::StopAll => script::stop_all(vm, host, params),
        CommandOp::SystemScript => script::system_script(vm, host, params),
        CommandOp::ListActiveScripts => script::list_active_scripts(vm, host, params),
        CommandOp::GetScriptVersion => script::get_script_version(vm, host, params),
        CommandOp::ReqVersion => script::req_version(vm, host, params),

        CommandOp::Add => text::arithmetic(vm, host, params, |a, b| Ok(a + b)),
        CommandOp::Subtract => text::arithmetic(vm, host, params, |a, b| Ok(a - b)),
        CommandOp::Multiply => text::arithmetic(vm, host, params, |a, b| Ok(a * b)),
        CommandOp::Divide => text::arithmetic(vm, host, params, |a, b| {
            if b == 0.0 {
                Err(ScriptError::runtime("division by zero"))
            } else {
                Ok(a / b)
            }
        }),
        CommandOp::MergeText => text::merge_text(vm, host, params),
        CommandOp::CutText => text::cut_text(vm, host, params),
        CommandOp::GetWord => text::get_word(vm, host, params),
        CommandOp::GetWordCount => text::get_word_count(vm, host, params),
        CommandOp::StripText => text::strip_text(vm, host, params),
        CommandOp::ReplaceText => text::replace_text(vm, host, params),
        CommandOp::UpperCase => text::upper_case(vm, host, params),
        CommandOp::LowerCase => text::lower_case(vm, host, params),
        CommandOp::GetLength => text::get_length(vm, host, params),
        CommandOp::IsNumber => text::is_number(vm, host, params),
        CommandOp::Round => text::round(vm, host, params),
        CommandOp::Random => text::random(vm, host, params),
        CommandOp::GetDate => text::get_date(vm, host, params),
        CommandOp::GetTime => text::get_time(vm, host, params),
        CommandOp::GetDateTime => text::get_date_time(vm, host, params),

        CommandOp::GetSector => game::get_sector(vm, host, params).await,
        CommandOp::GetSectorParameter => game::get_sector_parameter(vm, host, params).await,
        CommandOp::SetSectorParameter => game::set_sector_parameter(vm, host, params).await,
    }
}

// Shared parameter helpers

/// Evaluates the parameter at `index` to a value
pub(self) fn value(
    vm: &mut Vm,
    host: &ScriptHost<'_>,
    params: &[Expr],
    index: usize,
) -> ScriptResult<Value> {
    let expr = params
        .get(index)
        .ok_or_else(|| ScriptError::runtime(format!("missing parameter {}", index + 1)))?;
    vm.eval(expr, host)
}

pub(self) fn text_value(
    vm: &mut Vm,
    host: &ScriptHost<'_>,
    params: &[Expr],
    index: usize,
) -> ScriptResult<String> {
    Ok(value(vm, host, params, index)?.to_text())
}

pub(self) fn number_value(
    vm: &mut Vm,
    host: &ScriptHost<'_>,
    params: &[Expr],
    index: usize,
) -> ScriptResult<f64> {
    value(vm, host, params, index)?.to_number()
}

/// Resolves the parameter at `index` as a write target
pub(self) fn var_target(
    vm: &mut Vm,
    host: &ScriptHost<'_>,
    params: &[Expr],
    index: usize,
) -> ScriptResult<(String, Vec<String>)> {
    match params.get(index) {
        Some(Expr::Var(var)) => vm.resolve_ref(&var.clone(), host),
        _ => Err(ScriptError::runtime(format!(
            "parameter {} must be a variable",
            index + 1
        ))),
    }
}

/// Labels may arrive as label tokens or quoted text
pub(self) fn label_value(
    vm: &mut Vm,
    host: &ScriptHost<'_>,
    params: &[Expr],
    index: usize,
) -> ScriptResult<String> {
    match params.get(index) {
        Some(Expr::Label(name)) => Ok(name.clone()),
        Some(other) => Ok(vm.eval(other, host)?.to_text()),
        None => Err(ScriptError::runtime("missing label parameter")),
    }
}

/// Concatenates every parameter, the shape SEND and ECHO take
pub(self) fn joined_text(
    vm: &mut Vm,
    host: &ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<String> {
    let mut out = String::new();
    for index in 0..params.len() {
        out.push_str(&text_value(vm, host, params, index)?);
    }
    Ok(out)
}
