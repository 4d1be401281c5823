//! Compiler phases as chainable events
//!
//! Each phase reads one context key and writes the next:
//!
//! ```text
//! source_code (String) -> tokens (Vec<Token>) -> ast (Program) -> output_code (String)
//! ```
//!
//! On failure a phase stores nothing, so earlier phases' outputs stay in
//! the context for middleware and drivers to inspect. The type checker
//! is the one exception to strict forward flow: it takes the AST out,
//! annotates it, and re-installs it under the same key.

use coretiny_chain::{ChainableEvent, Context, DetailLevel, ErrorCode, EventResult, Value};
use tracing::debug;

use crate::ast::Program;
use crate::codegen;
use crate::config::CompilerConfig;
use crate::lexer::lex_source;
use crate::parser::parse_tokens;
use crate::token::{TokenKind, TokenList};
use crate::typechecker::check_program;

/// Context keys threaded between the phases.
pub mod keys {
    pub const SOURCE_CODE: &str = "source_code";
    pub const TOKENS: &str = "tokens";
    pub const AST: &str = "ast";
    pub const OUTPUT_CODE: &str = "output_code";
}

/// `source_code` -> `tokens`
pub struct LexerEvent;

impl ChainableEvent for LexerEvent {
    fn name(&self) -> &str {
        "Lexer"
    }

    fn execute(&self, context: &Context) -> EventResult {
        let source = match context.get(keys::SOURCE_CODE) {
            Ok(value) => value,
            Err(_) => {
                return EventResult::failure(
                    "No source code provided",
                    ErrorCode::InvalidParameter,
                    DetailLevel::Full,
                );
            }
        };
        let Some(source) = source.downcast_ref::<String>() else {
            return EventResult::failure(
                "No source code provided",
                ErrorCode::InvalidParameter,
                DetailLevel::Full,
            );
        };

        let tokens = lex_source(source);
        debug!(count = tokens.len(), "lexed source");

        if let Some(bad) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
            return EventResult::failure(
                format!(
                    "Lexer error at line {}, column {}: unexpected character '{}'",
                    bad.line, bad.column, bad.lexeme
                ),
                ErrorCode::InvalidParameter,
                DetailLevel::Full,
            );
        }

        if let Err(code) = context.set(keys::TOKENS, Value::new(tokens)) {
            return EventResult::failure(
                "Failed to store tokens in context",
                code,
                DetailLevel::Full,
            );
        }

        EventResult::success()
    }
}

/// `tokens` -> `ast`
pub struct ParserEvent;

impl ChainableEvent for ParserEvent {
    fn name(&self) -> &str {
        "Parser"
    }

    fn execute(&self, context: &Context) -> EventResult {
        let tokens = match context.get(keys::TOKENS) {
            Ok(value) => value,
            Err(_) => {
                return EventResult::failure(
                    "No tokens provided to parser",
                    ErrorCode::InvalidParameter,
                    DetailLevel::Full,
                );
            }
        };
        let Some(tokens) = tokens.downcast_ref::<TokenList>() else {
            return EventResult::failure(
                "No tokens provided to parser",
                ErrorCode::InvalidParameter,
                DetailLevel::Full,
            );
        };

        let program = match parse_tokens(tokens) {
            Ok(program) => program,
            Err(message) => {
                return EventResult::failure(
                    format!("Parser failed: {message}"),
                    ErrorCode::InvalidParameter,
                    DetailLevel::Full,
                );
            }
        };
        debug!(functions = program.functions.len(), "parsed program");

        if let Err(code) = context.set(keys::AST, Value::new(program)) {
            return EventResult::failure("Failed to store AST in context", code, DetailLevel::Full);
        }

        EventResult::success()
    }
}

/// `ast` -> `ast` (typed)
pub struct TypeCheckerEvent;

impl ChainableEvent for TypeCheckerEvent {
    fn name(&self) -> &str {
        "TypeChecker"
    }

    fn execute(&self, context: &Context) -> EventResult {
        let value = match context.get(keys::AST) {
            Ok(value) => value,
            Err(_) => {
                return EventResult::failure(
                    "No AST provided to type checker",
                    ErrorCode::InvalidParameter,
                    DetailLevel::Full,
                );
            }
        };

        // Take the tree out so it can be annotated without copying; a
        // middleware still holding a handle forces a clone and keeps its
        // untyped snapshot.
        if let Err(code) = context.remove(keys::AST) {
            return EventResult::failure("No AST provided to type checker", code, DetailLevel::Full);
        }
        let Some(mut program) = value.take::<Program>() else {
            return EventResult::failure(
                "No AST provided to type checker",
                ErrorCode::InvalidParameter,
                DetailLevel::Full,
            );
        };

        let check = check_program(&mut program);

        // The tree goes back under its key whether or not checking
        // passed, mirroring in-place annotation: later phases and
        // middleware still see the AST after a type error.
        if let Err(code) = context.set(keys::AST, Value::new(program)) {
            return EventResult::failure("Failed to store AST in context", code, DetailLevel::Full);
        }

        match check {
            Ok(()) => {
                debug!("type checking passed");
                EventResult::success()
            }
            Err(message) => EventResult::failure(
                format!("Type checking failed: {message}"),
                ErrorCode::InvalidParameter,
                DetailLevel::Full,
            ),
        }
    }
}

/// `ast` -> `output_code`
pub struct CodegenEvent {
    config: CompilerConfig,
}

impl CodegenEvent {
    pub fn new(config: CompilerConfig) -> Self {
        CodegenEvent { config }
    }
}

impl ChainableEvent for CodegenEvent {
    fn name(&self) -> &str {
        "CodeGen"
    }

    fn execute(&self, context: &Context) -> EventResult {
        let value = match context.get(keys::AST) {
            Ok(value) => value,
            Err(_) => {
                return EventResult::failure(
                    "No AST provided to code generator",
                    ErrorCode::InvalidParameter,
                    DetailLevel::Full,
                );
            }
        };
        let Some(program) = value.downcast_ref::<Program>() else {
            return EventResult::failure(
                "No AST provided to code generator",
                ErrorCode::InvalidParameter,
                DetailLevel::Full,
            );
        };

        let output = codegen::generate(program, &self.config);
        debug!(emitter = ?self.config.target, bytes = output.len(), "generated code");

        if let Err(code) = context.set(keys::OUTPUT_CODE, Value::new(output)) {
            return EventResult::failure(
                "Failed to store output code in context",
                code,
                DetailLevel::Full,
            );
        }

        EventResult::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_event_without_source_fails() {
        let ctx = Context::new();
        let result = LexerEvent.execute(&ctx);
        assert!(result.is_failure());
        assert_eq!(result.error_message, "No source code provided");
        assert!(!ctx.has(keys::TOKENS, false));
    }

    #[test]
    fn test_lexer_event_produces_tokens() {
        let ctx = Context::new();
        ctx.set(
            keys::SOURCE_CODE,
            Value::new(String::from("func main() : int { return 0; }")),
        )
        .unwrap();

        assert!(LexerEvent.execute(&ctx).success);
        let tokens = ctx.get(keys::TOKENS).unwrap();
        let tokens = tokens.downcast_ref::<TokenList>().unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_lexer_event_reports_first_bad_character() {
        let ctx = Context::new();
        ctx.set(keys::SOURCE_CODE, Value::new(String::from("var $ = 1;")))
            .unwrap();

        let result = LexerEvent.execute(&ctx);
        assert!(result.is_failure());
        assert_eq!(
            result.error_message,
            "Lexer error at line 1, column 4: unexpected character '$'"
        );
        // Nothing was stored on failure.
        assert!(!ctx.has(keys::TOKENS, false));
    }

    #[test]
    fn test_parser_event_requires_tokens() {
        let ctx = Context::new();
        let result = ParserEvent.execute(&ctx);
        assert!(result.is_failure());
        assert_eq!(result.error_message, "No tokens provided to parser");
    }

    #[test]
    fn test_type_checker_annotates_in_context() {
        let ctx = Context::new();
        ctx.set(
            keys::SOURCE_CODE,
            Value::new(String::from(
                "func main() : int { var ok = true; if (ok) { return 1; } return 0; }",
            )),
        )
        .unwrap();
        assert!(LexerEvent.execute(&ctx).success);
        assert!(ParserEvent.execute(&ctx).success);
        assert!(TypeCheckerEvent.execute(&ctx).success);

        let ast = ctx.get(keys::AST).unwrap();
        let program = ast.downcast_ref::<Program>().unwrap();
        let crate::ast::Stmt::Block(body) = &program.functions[0].body else {
            panic!()
        };
        let crate::ast::Stmt::VarDecl { ty, .. } = &body[0] else { panic!() };
        assert_eq!(*ty, crate::ast::Type::Bool);
    }

    #[test]
    fn test_codegen_event_writes_output() {
        let ctx = Context::new();
        ctx.set(
            keys::SOURCE_CODE,
            Value::new(String::from("func main() : int { return 0; }")),
        )
        .unwrap();
        assert!(LexerEvent.execute(&ctx).success);
        assert!(ParserEvent.execute(&ctx).success);
        assert!(TypeCheckerEvent.execute(&ctx).success);
        assert!(CodegenEvent::new(CompilerConfig::default()).execute(&ctx).success);

        let output = ctx.get(keys::OUTPUT_CODE).unwrap();
        let output = output.downcast_ref::<String>().unwrap();
        assert!(output.contains("define i32 @main()"));
    }
}
