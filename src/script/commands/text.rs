//! Text and math commands.

use super::{number_value, text_value, var_target};
use crate::script::ast::Expr;
use crate::script::value::format_number;
use crate::script::vm::{ScriptHost, Vm};
use crate::script::{ScriptError, ScriptResult};
use chrono::Local;
use rand::Rng;

/// Shared shape of `add`/`subtract`/`multiply`/`divide`: the variable
/// is both operand and destination
pub(super) fn arithmetic(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
    apply: fn(f64, f64) -> ScriptResult<f64>,
) -> ScriptResult<()> {
    let operand = number_value(vm, host, params, 1)?;
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let current = vm.vars.get(&base, &indexes)?;
    let current: f64 = if current.trim().is_empty() {
        0.0
    } else {
        current
            .trim()
            .parse()
            .map_err(|_| ScriptError::runtime(format!("'{current}' is not a number")))?
    };
    let result = apply(current, operand)?;
    vm.vars.set(&base, &indexes, &format_number(result))
}

/// `mergeText <value> <value> $result`
pub(super) fn merge_text(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let first = text_value(vm, host, params, 0)?;
    let second = text_value(vm, host, params, 1)?;
    let (base, indexes) = var_target(vm, host, params, 2)?;
    vm.vars.set(&base, &indexes, &format!("{first}{second}"))
}

/// `cutText <value> $result <start> <length>`, start is 1-based
pub(super) fn cut_text(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let source = text_value(vm, host, params, 0)?;
    let start = number_value(vm, host, params, 2)? as usize;
    let length = number_value(vm, host, params, 3)? as usize;
    if start < 1 {
        return Err(ScriptError::runtime("cutText start is 1-based"));
    }
    let cut: String = source.chars().skip(start - 1).take(length).collect();
    let (base, indexes) = var_target(vm, host, params, 1)?;
    vm.vars.set(&base, &indexes, &cut)
}

/// `getWord <line> $result <index> [<default>]`, index is 1-based
pub(super) fn get_word(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let line = text_value(vm, host, params, 0)?;
    let index = number_value(vm, host, params, 2)? as usize;
    let fallback = if params.len() > 3 {
        text_value(vm, host, params, 3)?
    } else {
        String::new()
    };
    let word = line
        .split_whitespace()
        .nth(index.saturating_sub(1))
        .map(str::to_string)
        .unwrap_or(fallback);
    let (base, indexes) = var_target(vm, host, params, 1)?;
    vm.vars.set(&base, &indexes, &word)
}

/// `getWordCount <line> $result`
pub(super) fn get_word_count(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let line = text_value(vm, host, params, 0)?;
    let count = line.split_whitespace().count();
    let (base, indexes) = var_target(vm, host, params, 1)?;
    vm.vars.set(&base, &indexes, &count.to_string())
}

/// `stripText $var <text>` removes every occurrence
pub(super) fn strip_text(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let needle = text_value(vm, host, params, 1)?;
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let current = vm.vars.get(&base, &indexes)?;
    vm.vars.set(&base, &indexes, &current.replace(&needle, ""))
}

/// `replaceText $var <old> <new>`
pub(super) fn replace_text(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let old = text_value(vm, host, params, 1)?;
    let new = text_value(vm, host, params, 2)?;
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let current = vm.vars.get(&base, &indexes)?;
    vm.vars.set(&base, &indexes, &current.replace(&old, &new))
}

pub(super) fn upper_case(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let current = vm.vars.get(&base, &indexes)?;
    vm.vars.set(&base, &indexes, &current.to_uppercase())
}

pub(super) fn lower_case(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let current = vm.vars.get(&base, &indexes)?;
    vm.vars.set(&base, &indexes, &current.to_lowercase())
}

/// `getLength <value> $result`
pub(super) fn get_length(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let value = text_value(vm, host, params, 0)?;
    let (base, indexes) = var_target(vm, host, params, 1)?;
    vm.vars
        .set(&base, &indexes, &value.chars().count().to_string())
}

/// `isNumber $result <value>`
pub(super) fn is_number(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let value = text_value(vm, host, params, 1)?;
    let numeric = !value.trim().is_empty() && value.trim().parse::<f64>().is_ok();
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars
        .set(&base, &indexes, if numeric { "1" } else { "0" })
}

/// `round $var [<decimals>]`
pub(super) fn round(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let decimals = if params.len() > 1 {
        number_value(vm, host, params, 1)? as i32
    } else {
        0
    };
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let current = vm.vars.get(&base, &indexes)?;
    let number: f64 = current
        .trim()
        .parse()
        .map_err(|_| ScriptError::runtime(format!("'{current}' is not a number")))?;
    let factor = 10f64.powi(decimals);
    let rounded = (number * factor).round() / factor;
    vm.vars.set(&base, &indexes, &format_number(rounded))
}

/// `random $var <max>` yields a uniform value in 1..=max
pub(super) fn random(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let max = number_value(vm, host, params, 1)? as i64;
    if max < 1 {
        return Err(ScriptError::runtime("random upper bound must be positive"));
    }
    let value = rand::thread_rng().gen_range(1..=max);
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(&base, &indexes, &value.to_string())
}

pub(super) fn get_date(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(
        &base,
        &indexes,
        &Local::now().format("%m/%d/%Y").to_string(),
    )
}

pub(super) fn get_time(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars
        .set(&base, &indexes, &Local::now().format("%H:%M:%S").to_string())
}

pub(super) fn get_date_time(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(
        &base,
        &indexes,
        &Local::now().format("%m/%d/%Y %H:%M:%S").to_string(),
    )
}
