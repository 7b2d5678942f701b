//! Include resolution and the compile entry point. Included files are
//! preprocessed and parsed like any other source, then spliced in place
//! of their `INCLUDE` statement. Cycles abort compilation.

use super::ast::{Expr, Stmt};
use super::parser::parse_source;
use super::preprocessor::preprocess;
use super::vm::Program;
use super::{ScriptError, ScriptResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of compiling a script source file
#[derive(Debug)]
pub struct CompiledScript {
    pub program: Program,
    /// Files pulled in through includes, in resolution order
    pub includes: Vec<PathBuf>,
}

/// Compiles a script file into an executable program
pub fn compile_file(path: &Path) -> ScriptResult<CompiledScript> {
    let mut counter = 0;
    let mut stack = Vec::new();
    let mut includes = Vec::new();
    let stmts = load_parsed(path, &mut counter, &mut stack, &mut includes)?;
    let program = Program::assemble(stmts)?;
    Ok(CompiledScript { program, includes })
}

/// Compiles source text directly, used by tests and the console
pub fn compile_source(source: &str, base_dir: &Path) -> ScriptResult<CompiledScript> {
    let mut counter = 0;
    let mut stack = Vec::new();
    let mut includes = Vec::new();
    let lowered = preprocess(source, &mut counter)?;
    let stmts = parse_source(&lowered)?;
    let stmts = splice_includes(stmts, base_dir, &mut counter, &mut stack, &mut includes)?;
    let program = Program::assemble(stmts)?;
    Ok(CompiledScript { program, includes })
}

fn load_parsed(
    path: &Path,
    counter: &mut usize,
    stack: &mut Vec<PathBuf>,
    includes: &mut Vec<PathBuf>,
) -> ScriptResult<Vec<Stmt>> {
    let canonical = path
        .canonicalize()
        .map_err(|err| ScriptError::compile(0, format!("cannot open {}: {err}", path.display())))?;

    if stack.contains(&canonical) {
        return Err(ScriptError::compile(
            0,
            format!("include cycle through {}", canonical.display()),
        ));
    }
    stack.push(canonical.clone());

    let source = fs::read_to_string(&canonical)?;
    let lowered = preprocess(&source, counter)?;
    let stmts = parse_source(&lowered)?;
    let base_dir = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let stmts = splice_includes(stmts, &base_dir, counter, stack, includes)?;

    stack.pop();
    Ok(stmts)
}

/// Replaces INCLUDE statements with the parsed statements of the named
/// file, resolved relative to the including file's directory
fn splice_includes(
    stmts: Vec<Stmt>,
    base_dir: &Path,
    counter: &mut usize,
    stack: &mut Vec<PathBuf>,
    includes: &mut Vec<PathBuf>,
) -> ScriptResult<Vec<Stmt>> {
    let mut output = Vec::with_capacity(stmts.len());

    for stmt in stmts {
        let Stmt::Command { name, params, line } = &stmt else {
            output.push(stmt);
            continue;
        };
        if name != "INCLUDE" {
            output.push(stmt);
            continue;
        }

        let target = match params.first() {
            Some(Expr::Str(path)) => path.clone(),
            Some(Expr::Ident(path)) => path.clone(),
            _ => {
                return Err(ScriptError::compile(
                    *line,
                    "INCLUDE expects a quoted path",
                ));
            }
        };

        let resolved = base_dir.join(&target);
        includes.push(resolved.clone());
        let mut inner = load_parsed(&resolved, counter, stack, includes)?;
        output.append(&mut inner);
    }

    Ok(output)
}

#[cfg(test)]
mod test {
    use super::{compile_file, compile_source};
    use std::fs;

    #[test]
    fn test_include_splices_statements() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lib.twx"), "setVar $fromlib 1\n").unwrap();
        fs::write(
            dir.path().join("main.twx"),
            "INCLUDE \"lib.twx\"\nECHO done\n",
        )
        .unwrap();

        let compiled = compile_file(&dir.path().join("main.twx")).unwrap();
        assert_eq!(compiled.program.instructions.len(), 2);
        assert_eq!(compiled.includes.len(), 1);
    }

    #[test]
    fn test_include_cycle_detected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.twx"), "INCLUDE \"b.twx\"\n").unwrap();
        fs::write(dir.path().join("b.twx"), "INCLUDE \"a.twx\"\n").unwrap();

        let err = compile_file(&dir.path().join("a.twx")).unwrap_err();
        assert!(err.to_string().contains("include cycle"));
    }

    #[test]
    fn test_missing_include_is_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.twx"), "INCLUDE \"absent.twx\"\n").unwrap();
        assert!(compile_file(&dir.path().join("main.twx")).is_err());
    }

    #[test]
    fn test_synthetic_labels_unique_across_includes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.twx"),
            "IF 1\nECHO lib\nEND\n",
        )
        .unwrap();
        let source = "IF 1\nECHO main\nEND\nINCLUDE \"lib.twx\"\n";
        let compiled = compile_source(source, dir.path()).unwrap();
        // Both IF blocks produced distinct labels
        assert!(compiled.program.labels.len() >= 2);
    }
}
