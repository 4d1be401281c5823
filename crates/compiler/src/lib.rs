//! CoreTiny compiler library
//!
//! A small compiler for the CoreTiny language (ints, bools, functions,
//! `if`/`while`/`return`), organized as an event chain: lexing, parsing,
//! type checking, and code generation are four events threading their
//! results through the chain's shared context. Cross-cutting concerns
//! (timing, memory watching, chaos injection) attach as middleware
//! around every phase without touching the phases themselves.
//!
//! # Example
//!
//! ```
//! use coretinyc::{CompilerConfig, Target, compile_source};
//!
//! let config = CompilerConfig::new().with_target(Target::C);
//! let code = compile_source("func main() : int { print(7); return 0; }", &config).unwrap();
//! assert!(code.contains("printf(\"%d\\n\", 7)"));
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod events;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod typechecker;

pub use ast::{BinaryOp, Expr, ExprKind, Function, Param, Program, Stmt, Type, UnaryOp};
pub use config::{CompilerConfig, Target};
pub use events::{CodegenEvent, LexerEvent, ParserEvent, TypeCheckerEvent, keys};
pub use lexer::lex_source;
pub use parser::{Parser, parse_tokens};
pub use token::{Token, TokenKind, TokenList};
pub use typechecker::check_program;

use std::fs;
use std::path::Path;

use coretiny_chain::{Chain, ChainResult, ErrorCode, FaultMode, Value};

/// Assemble the four-phase compiler pipeline for `config`.
///
/// The caller may attach middleware before executing. Fault mode derives
/// from [`CompilerConfig::stop_on_first_error`].
pub fn build_compiler_chain(config: &CompilerConfig) -> Result<Chain, ErrorCode> {
    let fault_mode = if config.stop_on_first_error {
        FaultMode::Strict
    } else {
        FaultMode::Lenient
    };

    let mut chain = Chain::new(fault_mode);
    chain.add_event(Box::new(LexerEvent))?;
    chain.add_event(Box::new(ParserEvent))?;
    chain.add_event(Box::new(TypeCheckerEvent))?;
    chain.add_event(Box::new(CodegenEvent::new(config.clone())))?;
    Ok(chain)
}

/// Render a chain's recorded failures, one per line, each prefixed with
/// the phase that produced it.
pub fn format_failures(result: &ChainResult) -> String {
    result
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.event_name, f.error_message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compile `source` and return the emitted artifact.
///
/// Builds a chain, seeds the context with the source text, executes,
/// and reads back `output_code`. On failure the error is the formatted
/// failure list.
pub fn compile_source(source: &str, config: &CompilerConfig) -> Result<String, String> {
    let chain = build_compiler_chain(config)
        .map_err(|code| format!("Failed to build compiler chain: {code}"))?;

    chain
        .context()
        .set(keys::SOURCE_CODE, Value::new(source.to_string()))
        .map_err(|code| format!("Failed to seed source code: {code}"))?;

    let result = chain.execute();

    match chain.context().get(keys::OUTPUT_CODE) {
        Ok(output) => output
            .downcast_ref::<String>()
            .cloned()
            .ok_or_else(|| "No output code produced".to_string()),
        Err(_) if result.failures.is_empty() => Err("No output code produced".to_string()),
        Err(_) => Err(format_failures(&result)),
    }
}

/// Compile `source_path` and write the artifact to `output_path`.
pub fn compile_file(
    source_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), String> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| format!("Failed to read source file: {e}"))?;

    let output = compile_source(&source, config)?;

    fs::write(output_path, output).map_err(|e| format!("Failed to write output file: {e}"))
}
