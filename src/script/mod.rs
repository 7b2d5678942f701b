//! Scripting runtime: a stack based VM for the legacy trigger-driven
//! automation language, with a preprocessor that lowers structured
//! control flow into conditional branches.

pub mod ast;
pub mod commands;
pub mod engine;
pub mod include;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod triggers;
pub mod value;
pub mod vars;
pub mod vm;

use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Error)]
pub enum ScriptError {
    /// Lex, parse, preprocess or include failures, with the source
    /// line where known
    #[error("line {line}: {message}")]
    Compile { line: usize, message: String },

    /// Failures raised while a script executes
    #[error("{0}")]
    Runtime(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl ScriptError {
    pub fn compile(line: usize, message: impl Into<String>) -> Self {
        Self::Compile {
            line,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }
}
