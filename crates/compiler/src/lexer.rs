//! Lexer for CoreTiny source text
//!
//! A deterministic single-pass scanner with one character of lookahead.
//! Positions are tracked on every advance: a newline bumps the line and
//! resets the column to 0. Unrecognized characters (including a bare `&`
//! or `|`) become `Error` tokens rather than aborting the scan; the
//! lexer phase fails afterwards if any are present, naming the first
//! offender. The token list always ends in exactly one EOF token.

use crate::token::{Token, TokenKind, TokenList};

struct Lexer {
    chars: Vec<char>,
    current: usize,
    line: usize,
    column: usize,
    tokens: TokenList,
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_alnum(c: char) -> bool {
    is_alpha(c) || is_digit(c)
}

/// Keyword lookup; anything else is an identifier.
fn identifier_kind(lexeme: &str) -> TokenKind {
    match lexeme {
        "func" => TokenKind::Func,
        "var" => TokenKind::Var,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "int" => TokenKind::Int,
        "bool" => TokenKind::Bool,
        _ => TokenKind::Identifier,
    }
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            current: 0,
            line: 1,
            column: 0,
            tokens: Vec::new(),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.current + 1]
        }
    }

    fn advance(&mut self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        let c = self.chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn add_token(&mut self, kind: TokenKind, lexeme: &str, line: usize, column: usize) {
        self.tokens.push(Token::new(kind, lexeme, line, column));
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            let c = self.peek();
            if c == ' ' || c == '\r' || c == '\t' || c == '\n' {
                self.advance();
            } else if c == '/' && self.peek_next() == '/' {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            } else if c == '/' && self.peek_next() == '*' {
                self.advance();
                self.advance();
                // Non-nesting; unterminated comments consume to EOF silently
                while !self.is_at_end() {
                    if self.peek() == '*' && self.peek_next() == '/' {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn scan_identifier(&mut self, start: usize, line: usize, column: usize) {
        while is_alnum(self.peek()) {
            self.advance();
        }
        let lexeme: String = self.chars[start..self.current].iter().collect();
        let kind = identifier_kind(&lexeme);
        self.add_token(kind, &lexeme, line, column);
    }

    fn scan_number(&mut self, start: usize, line: usize, column: usize) {
        while is_digit(self.peek()) {
            self.advance();
        }
        let lexeme: String = self.chars[start..self.current].iter().collect();
        self.add_token(TokenKind::IntLiteral, &lexeme, line, column);
    }

    fn scan_token(&mut self) {
        self.skip_whitespace();

        if self.is_at_end() {
            let (line, column) = (self.line, self.column);
            self.add_token(TokenKind::Eof, "", line, column);
            return;
        }

        let start = self.current;
        let start_line = self.line;
        let start_column = self.column;
        let c = self.advance();

        if is_alpha(c) {
            self.scan_identifier(start, start_line, start_column);
            return;
        }
        if is_digit(c) {
            self.scan_number(start, start_line, start_column);
            return;
        }

        let (kind, lexeme) = match c {
            '(' => (TokenKind::LParen, "("),
            ')' => (TokenKind::RParen, ")"),
            '{' => (TokenKind::LBrace, "{"),
            '}' => (TokenKind::RBrace, "}"),
            ';' => (TokenKind::Semicolon, ";"),
            ':' => (TokenKind::Colon, ":"),
            ',' => (TokenKind::Comma, ","),
            '+' => (TokenKind::Plus, "+"),
            '-' => (TokenKind::Minus, "-"),
            '*' => (TokenKind::Star, "*"),
            '/' => (TokenKind::Slash, "/"),
            '%' => (TokenKind::Percent, "%"),
            '=' => {
                if self.matches('=') {
                    (TokenKind::Eq, "==")
                } else {
                    (TokenKind::Assign, "=")
                }
            }
            '!' => {
                if self.matches('=') {
                    (TokenKind::Ne, "!=")
                } else {
                    (TokenKind::Not, "!")
                }
            }
            '<' => {
                if self.matches('=') {
                    (TokenKind::Le, "<=")
                } else {
                    (TokenKind::Lt, "<")
                }
            }
            '>' => {
                if self.matches('=') {
                    (TokenKind::Ge, ">=")
                } else {
                    (TokenKind::Gt, ">")
                }
            }
            '&' => {
                if self.matches('&') {
                    (TokenKind::And, "&&")
                } else {
                    (TokenKind::Error, "&")
                }
            }
            '|' => {
                if self.matches('|') {
                    (TokenKind::Or, "||")
                } else {
                    (TokenKind::Error, "|")
                }
            }
            other => {
                let lexeme = other.to_string();
                self.add_token(TokenKind::Error, &lexeme, start_line, start_column);
                return;
            }
        };
        self.add_token(kind, lexeme, start_line, start_column);
    }
}

/// Scan `source` into a token list. Always succeeds; malformed input is
/// reported through `Error` tokens.
pub fn lex_source(source: &str) -> TokenList {
    let mut lexer = Lexer::new(source);

    while !lexer.is_at_end() {
        lexer.scan_token();
        if matches!(lexer.tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            break;
        }
    }

    if !matches!(lexer.tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
        let (line, column) = (lexer.line, lexer.column);
        lexer.add_token(TokenKind::Eof, "", line, column);
    }

    lexer.tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &TokenList) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = lex_source("func main iffy var returned int");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Func,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Int,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].lexeme, "iffy");
        assert_eq!(tokens[4].lexeme, "returned");
    }

    #[test]
    fn test_two_character_operators() {
        let tokens = lex_source("== != <= >= && || = ! < >");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Assign,
                TokenKind::Not,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bare_ampersand_and_pipe_are_errors() {
        let tokens = lex_source("a & b | c");
        let errors: Vec<&Token> = tokens.iter().filter(|t| t.kind == TokenKind::Error).collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].lexeme, "&");
        assert_eq!(errors[1].lexeme, "|");
    }

    #[test]
    fn test_unknown_character_is_error() {
        let tokens = lex_source("x @ y");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, "@");
    }

    #[test]
    fn test_positions() {
        let tokens = lex_source("func\n  main");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 0));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 2));
    }

    #[test]
    fn test_line_comment() {
        let tokens = lex_source("a // everything here vanishes ; { }\nb");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_block_comment() {
        let tokens = lex_source("a /* ignored * stuff */ b");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_block_comment_consumes_to_eof() {
        let tokens = lex_source("a /* never closed\nreturn 0;");
        assert_eq!(kinds(&tokens), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn test_eof_is_always_last_and_unique() {
        for source in ["", "   ", "func main", "/* only a comment */"] {
            let tokens = lex_source(source);
            assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
            let eof_count = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
            assert_eq!(eof_count, 1, "source: {source:?}");
        }
    }

    #[test]
    fn test_integer_literal_value() {
        let tokens = lex_source("9223372036854775807");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[0].value, i64::MAX);
    }

    #[test]
    fn test_lexing_is_deterministic() {
        let source = "func main() : int { var x = 1; return x; }";
        assert_eq!(lex_source(source), lex_source(source));
    }
}
