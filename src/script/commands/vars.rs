//! Variable and array commands.

use super::{number_value, text_value, var_target};
use crate::script::ast::Expr;
use crate::script::vm::{ScriptHost, Vm};
use crate::script::{ScriptError, ScriptResult};

/// `setVar $var <value>`
pub(super) fn set_var(vm: &mut Vm, host: &mut ScriptHost<'_>, params: &[Expr]) -> ScriptResult<()> {
    let new_value = text_value(vm, host, params, 1)?;
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(&base, &indexes, &new_value)
}

/// `setArray $var <dim> [<dim>...]` declares a static array
pub(super) fn set_array(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    if !indexes.is_empty() {
        return Err(ScriptError::runtime(
            "setArray declares a whole variable, not an element",
        ));
    }
    let mut dims = Vec::new();
    for index in 1..params.len() {
        let dim = number_value(vm, host, params, index)? as i64;
        if dim < 1 {
            return Err(ScriptError::runtime("array dimensions must be positive"));
        }
        dims.push(dim);
    }
    vm.vars.declare_array(&base, &dims);
    Ok(())
}

/// `clearArray $var`
pub(super) fn clear_array(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    vm.vars.clear_array(&base, &indexes)
}

/// `arraySize $array $result`
pub(super) fn array_size(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    let count = vm.vars.element_count(&base, &indexes)?;
    let (result, result_indexes) = var_target(vm, host, params, 1)?;
    vm.vars
        .set(&result, &result_indexes, &count.to_string())
}

/// `setArrayElement $array <index> <value>`
pub(super) fn set_array_element(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let index = text_value(vm, host, params, 1)?;
    let new_value = text_value(vm, host, params, 2)?;
    let (base, mut indexes) = var_target(vm, host, params, 0)?;
    indexes.push(index);
    vm.vars.set(&base, &indexes, &new_value)
}

/// `getArrayElement $result $array <index>`
pub(super) fn get_array_element(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let index = text_value(vm, host, params, 2)?;
    let (array, mut array_indexes) = var_target(vm, host, params, 1)?;
    array_indexes.push(index);
    let element = vm.vars.get(&array, &array_indexes)?;
    let (result, result_indexes) = var_target(vm, host, params, 0)?;
    vm.vars.set(&result, &result_indexes, &element)
}

/// `loadVar $var` restores the variable from the global store
pub(super) async fn load_var(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    if !indexes.is_empty() {
        return Err(ScriptError::runtime("loadVar works on whole variables"));
    }
    vm.vars.load(host.store.db(), &base).await?;
    Ok(())
}

/// `saveVar $var` persists the variable into the global store
pub(super) async fn save_var(
    vm: &mut Vm,
    host: &mut ScriptHost<'_>,
    params: &[Expr],
) -> ScriptResult<()> {
    let (base, indexes) = var_target(vm, host, params, 0)?;
    if !indexes.is_empty() {
        return Err(ScriptError::runtime("saveVar works on whole variables"));
    }
    vm.vars.save(host.store.db(), &base).await?;
    Ok(())
}
