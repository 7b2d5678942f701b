//! Stack based script executor. Programs are flat instruction lists
//! with labels resolved to positions; the step loop runs while the
//! state is Running and hands control back to the pipeline on every
//! suspension.

use super::ast::{BinOp, Expr, Stmt, UnaryOp, VarRef};
use super::commands::{self, CommandSpec};
use super::parser::parse_expression;
use super::triggers::TriggerManager;
use super::value::Value;
use super::vars::VarStore;
use super::{ScriptError, ScriptResult};
use crate::game::state::GameState;
use crate::game::store::GameStore;
use crate::services::events::EventPublisher;
use crate::utils::types::ScriptId;
use chrono::Local;
use std::collections::HashMap;

/// Operations a command queues for the engine to apply once the step
/// loop returns, avoiding reentrancy into the script registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    LoadScript(String),
    /// Stop a script by name, or the calling script when None
    StopScript(Option<String>),
    StopAll,
    /// Mark the calling script as a system script
    MarkSystem,
}

/// Everything a command handler can reach while executing
pub struct ScriptHost<'a> {
    pub store: &'a GameStore,
    pub events: &'a EventPublisher,
    pub game_state: &'a GameState,
    pub triggers: &'a TriggerManager,
    pub script_id: ScriptId,
    pub script_name: &'a str,
    /// Language version the running script targets
    pub version: i32,
    pub current_line: &'a str,
    pub current_ansi_line: &'a str,
    pub active_scripts: &'a [String],
    /// Text queued for the transport; the engine runs outbound
    /// triggers over it before writing
    pub outbound: &'a mut Vec<String>,
    pub ops: &'a mut Vec<EngineOp>,
}

#[derive(Debug, Clone)]
pub enum Instr {
    Command {
        spec: &'static CommandSpec,
        params: Vec<Expr>,
        line: usize,
    },
    /// Jump-on-false conditional the preprocessor lowers macros into
    Branch {
        cond: Expr,
        target: String,
        line: usize,
    },
    Goto {
        target: String,
        line: usize,
    },
}

#[derive(Debug, Default)]
pub struct Program {
    pub instructions: Vec<Instr>,
    pub labels: HashMap<String, usize>,
}

impl Program {
    /// Resolves statements into instructions, checking commands against
    /// the registry and collecting label positions
    pub fn assemble(stmts: Vec<Stmt>) -> ScriptResult<Program> {
        let mut program = Program::default();

        // Label positions point at the next instruction
        let mut position = 0;
        for stmt in &stmts {
            match stmt {
                Stmt::Label { name, line } => {
                    if program.labels.insert(name.clone(), position).is_some() {
                        return Err(ScriptError::compile(
                            *line,
                            format!("duplicate label ':{name}'"),
                        ));
                    }
                }
                Stmt::Command { .. } => position += 1,
            }
        }

        for stmt in stmts {
            let Stmt::Command { name, params, line } = stmt else {
                continue;
            };

            match name.as_str() {
                "GOTO" => {
                    let target = label_param(&params, 0, line)?;
                    program.instructions.push(Instr::Goto { target, line });
                    continue;
                }
                "BRANCH" => {
                    if params.len() != 2 {
                        return Err(ScriptError::compile(line, "BRANCH expects 2 parameters"));
                    }
                    // The condition usually arrives as quoted expression
                    // text from the preprocessor
                    let cond = match &params[0] {
                        Expr::Str(text) => parse_expression(text, line)?,
                        other => other.clone(),
                    };
                    let target = label_param(&params, 1, line)?;
                    program.instructions.push(Instr::Branch { cond, target, line });
                    continue;
                }
                _ => {}
            }

            let Some(spec) = commands::lookup(&name) else {
                return Err(ScriptError::compile(line, format!("unknown command '{name}'")));
            };
            if params.len() < spec.min || params.len() > spec.max {
                return Err(ScriptError::compile(
                    line,
                    format!(
                        "{} expects {}..{} parameters, found {}",
                        spec.name,
                        spec.min,
                        spec.max,
                        params.len()
                    ),
                ));
            }
            for &index in spec.var_params {
                if index < params.len() && !matches!(params[index], Expr::Var(_)) {
                    return Err(ScriptError::compile(
                        line,
                        format!("{} parameter {} must be a variable", spec.name, index + 1),
                    ));
                }
            }
            program.instructions.push(Instr::Command { spec, params, line });
        }

        // Jump targets must exist
        for instr in &program.instructions {
            let (target, line) = match instr {
                Instr::Branch { target, line, .. } => (target, line),
                Instr::Goto { target, line } => (target, line),
                Instr::Command { .. } => continue,
            };
            if !program.labels.contains_key(target) {
                return Err(ScriptError::compile(
                    *line,
                    format!("unknown label ':{target}'"),
                ));
            }
        }

        Ok(program)
    }
}

fn label_param(params: &[Expr], index: usize, line: usize) -> ScriptResult<String> {
    match params.get(index) {
        Some(Expr::Label(name)) => Ok(name.clone()),
        Some(Expr::Str(name)) => Ok(name.clone()),
        Some(Expr::Ident(name)) => Ok(name.clone()),
        _ => Err(ScriptError::compile(line, "expected a label parameter")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    /// Parked by PAUSE until an external resume
    Paused,
    /// Parked by WAITFOR until matching text arrives
    Waiting,
    /// Parked by GETINPUT until the user submits a line
    WaitingInput,
    Halted,
    Error,
}

/// GOSUB call frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub label: String,
    pub saved_pc: usize,
    pub return_pc: usize,
}

pub struct Vm {
    pub program: Program,
    pub pc: usize,
    pub call_stack: Vec<Frame>,
    pub state: VmState,
    /// Text WAITFOR is waiting on
    pub wait_text: Option<String>,
    /// Target variable of a pending GETINPUT
    pub input_target: Option<(String, Vec<String>)>,
    pub vars: VarStore,
    pub error: Option<String>,
}

impl Vm {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            pc: 0,
            call_stack: Vec::new(),
            state: VmState::Running,
            wait_text: None,
            input_target: None,
            vars: VarStore::new(),
            error: None,
        }
    }

    /// Steps instructions while Running. Suspensions return control to
    /// the caller; errors park the VM in the Error state.
    pub async fn run(&mut self, host: &mut ScriptHost<'_>) -> ScriptResult<()> {
        while self.state == VmState::Running {
            let Some(instr) = self.program.instructions.get(self.pc).cloned() else {
                self.state = VmState::Halted;
                break;
            };

            let result = self.step(&instr, host).await;
            if let Err(err) = result {
                self.state = VmState::Error;
                let message = match &instr {
                    Instr::Command { line, .. }
                    | Instr::Branch { line, .. }
                    | Instr::Goto { line, .. } => format!("line {line}: {err}"),
                };
                self.error = Some(message.clone());
                return Err(ScriptError::runtime(message));
            }
        }
        Ok(())
    }

    async fn step(&mut self, instr: &Instr, host: &mut ScriptHost<'_>) -> ScriptResult<()> {
        match instr {
            Instr::Goto { target, .. } => self.jump(target),
            Instr::Branch { cond, target, .. } => {
                let value = self.eval(cond, host)?;
                if value.is_truthy() {
                    self.pc += 1;
                    Ok(())
                } else {
                    self.jump(target)
                }
            }
            Instr::Command { spec, params, .. } => {
                // Advance first so suspensions resume past this
                // instruction and GOSUB records the right return
                self.pc += 1;
                commands::execute(self, host, spec.op, params).await
            }
        }
    }

    /// Moves the program counter to a label
    pub fn jump(&mut self, label: &str) -> ScriptResult<()> {
        match self.program.labels.get(label) {
            Some(&position) => {
                self.pc = position;
                Ok(())
            }
            None => Err(ScriptError::runtime(format!("unknown label ':{label}'"))),
        }
    }

    /// Jump used by trigger dispatch: clears any suspension and starts
    /// the VM at the trigger's label
    pub fn jump_and_wake(&mut self, label: &str) -> ScriptResult<()> {
        self.jump(label)?;
        self.wait_text = None;
        self.input_target = None;
        self.state = VmState::Running;
        Ok(())
    }

    /// Resolves a variable reference into its base name and evaluated
    /// index path
    pub fn resolve_ref(
        &mut self,
        var: &VarRef,
        host: &ScriptHost<'_>,
    ) -> ScriptResult<(String, Vec<String>)> {
        let mut indexes = Vec::with_capacity(var.indexes.len());
        for index in &var.indexes {
            indexes.push(self.eval(index, host)?.to_text());
        }
        Ok((var.name.clone(), indexes))
    }

    /// Evaluates an expression to a value
    pub fn eval(&mut self, expr: &Expr, host: &ScriptHost<'_>) -> ScriptResult<Value> {
        match expr {
            Expr::Str(text) => Ok(Value::Str(text.clone())),
            Expr::Num(value) => Ok(Value::Num(*value)),
            Expr::Label(name) => Ok(Value::Str(name.clone())),
            Expr::Ident(word) => Ok(self.system_constant(word, host)),
            Expr::Var(var) => {
                let (base, indexes) = self.resolve_ref(var, host)?;
                let text = self.vars.get(&base, &indexes)?;
                Ok(Value::Str(text))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, host)?;
                match op {
                    UnaryOp::Not => Ok(Value::bool(!value.is_truthy())),
                    UnaryOp::Neg => Ok(Value::Num(-value.to_number()?)),
                    UnaryOp::Pos => Ok(Value::Num(value.to_number()?)),
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, host)?;
                let right = self.eval(right, host)?;
                binary(*op, left, right)
            }
        }
    }

    /// Uppercase identifiers name system constants; anything unknown
    /// falls back to its literal text so bare words read naturally in
    /// parameter position
    fn system_constant(&self, word: &str, host: &ScriptHost<'_>) -> Value {
        match word.to_ascii_uppercase().as_str() {
            "TRUE" => Value::Num(1.0),
            "FALSE" => Value::Num(0.0),
            "CURRENTLINE" => Value::Str(host.current_line.to_string()),
            "CURRENTANSILINE" => Value::Str(host.current_ansi_line.to_string()),
            "CURRENTSECTOR" => Value::Num(host.game_state.current_sector() as f64),
            "VERSION" => Value::Num(host.version as f64),
            "DATE" => Value::Str(Local::now().format("%m/%d/%Y").to_string()),
            "TIME" => Value::Str(Local::now().format("%H:%M:%S").to_string()),
            _ => Value::Str(word.to_string()),
        }
    }
}

/// Applies a binary operator. Comparison is numeric whenever both
/// sides coerce, textual otherwise.
fn binary(op: BinOp, left: Value, right: Value) -> ScriptResult<Value> {
    match op {
        BinOp::Add => Ok(Value::Num(left.to_number()? + right.to_number()?)),
        BinOp::Sub => Ok(Value::Num(left.to_number()? - right.to_number()?)),
        BinOp::Mul => Ok(Value::Num(left.to_number()? * right.to_number()?)),
        BinOp::Div => {
            let divisor = right.to_number()?;
            if divisor == 0.0 {
                return Err(ScriptError::runtime("division by zero"));
            }
            Ok(Value::Num(left.to_number()? / divisor))
        }
        BinOp::Mod => {
            let divisor = right.to_number()?;
            if divisor == 0.0 {
                return Err(ScriptError::runtime("modulus by zero"));
            }
            Ok(Value::Num(left.to_number()? % divisor))
        }
        BinOp::Concat => Ok(Value::Str(format!(
            "{}{}",
            left.to_text(),
            right.to_text()
        ))),
        BinOp::And => Ok(Value::bool(left.is_truthy() && right.is_truthy())),
        BinOp::Or => Ok(Value::bool(left.is_truthy() || right.is_truthy())),
        BinOp::Xor => Ok(Value::bool(left.is_truthy() ^ right.is_truthy())),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (left.to_number(), right.to_number()) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b),
                _ => Some(left.to_text().cmp(&right.to_text())),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::bool(false));
            };
            let result = match op {
                BinOp::Eq => ordering.is_eq(),
                BinOp::Ne => ordering.is_ne(),
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::bool(result))
        }
    }
}
