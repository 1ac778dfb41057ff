// Tokenizer for the embedded expression grammar.
//
// Input expressions are lifted verbatim out of mascot XML attribute
// values, e.g. `${mascot.x + 10}` or `#{Math.random() * 2}`. This module
// turns such a string into a flat token sequence; `crate::parser` turns
// that sequence into an AST.

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpeningBracket,
    ClosingBracket,
    Operator,
    Question,
    Colon,
    Semicolon,
    Access,
    Comma,
    Invalid,
    Eof,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BracketKind {
    Expression,
    Array,
    Scope,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Power,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    LeftShift,
    RightShift,
    Or,
    And,
    Increment,
    Decrement,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Subkind {
    Bracket(BracketKind),
    Operator(OperatorKind),
    None,
}

/// Source position as (line, column), both zero-based.
pub type Pos = (usize, usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub subkind: Subkind,
    pub lexeme: String,
    pub start: Pos,
    pub end: Pos,
    pub invalid_reason: Option<String>,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.kind, self.lexeme)
    }
}

const IDENTIFIER_START: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
const DIGITS: &str = "0123456789";
const OPERATOR_CHARS: &str = "+-*/%&|^~<>=!";
const BRACKET_CHARS: &str = "()[]{}";
const WHITESPACE: &str = " \t\n";

fn operator_kind(lexeme: &str) -> Option<OperatorKind> {
    use OperatorKind::*;
    Some(match lexeme {
        "+" => Add,
        "-" => Subtract,
        "*" => Multiply,
        "/" => Divide,
        "%" => Modulus,
        "&" => BitwiseAnd,
        "|" => BitwiseOr,
        "^" => BitwiseXor,
        "~" => BitwiseNot,
        "<<" => LeftShift,
        ">>" => RightShift,
        "<" => LessThan,
        "<=" => LessThanOrEqual,
        ">" => GreaterThan,
        ">=" => GreaterThanOrEqual,
        "==" => Equal,
        "!=" => NotEqual,
        "**" => Power,
        "!" => Not,
        "||" => Or,
        "&&" => And,
        "++" => Increment,
        "--" => Decrement,
        _ => return None,
    })
}

fn bracket_kind(c: char) -> BracketKind {
    match c {
        '(' | ')' => BracketKind::Expression,
        '[' | ']' => BracketKind::Array,
        '{' | '}' => BracketKind::Scope,
        _ => unreachable!("not a bracket char"),
    }
}

fn is_opening_bracket(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

/// Strip the `${...}`/`#{...}` wrapper (caller already decided whether the
/// wrapper was present and which flavor, for `Program::evaluate_once`),
/// lowercase, and decode the fixed set of HTML-entity escapes, then patch
/// `math.random` so it parses as a call even when the source omitted the
/// parens before an immediately following arithmetic operator.
pub fn prepare(raw: &str) -> String {
    let unwrapped = if (raw.starts_with("${") || raw.starts_with("#{")) && raw.ends_with('}') {
        &raw[2..raw.len() - 1]
    } else {
        raw
    };

    let mut s = unwrapped.to_lowercase();
    for (from, to) in [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&amp;", "&"),
        ("&quot;", "\""),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&copy;", "\u{a9}"),
        ("&reg;", "\u{ae}"),
        ("&trade;", "\u{2122}"),
        ("&euro;", "\u{20ac}"),
        ("&pound;", "\u{a3}"),
    ] {
        s = s.replace(from, to);
    }
    for (from, to) in [
        ("math.random*", "math.random()*"),
        ("math.random/", "math.random()/"),
        ("math.random-", "math.random()-"),
        ("math.random+", "math.random()+"),
    ] {
        s = s.replace(from, to);
    }
    s
}

struct Pending {
    kind: TokenKind,
    lexeme: String,
    start: Pos,
    invalid_reason: Option<String>,
}

fn start_token(c: char, pos: Pos) -> Option<Pending> {
    if IDENTIFIER_START.contains(c) {
        Some(Pending { kind: TokenKind::Identifier, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if DIGITS.contains(c) {
        Some(Pending { kind: TokenKind::Number, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if OPERATOR_CHARS.contains(c) {
        Some(Pending { kind: TokenKind::Operator, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if BRACKET_CHARS.contains(c) {
        let kind = if is_opening_bracket(c) { TokenKind::OpeningBracket } else { TokenKind::ClosingBracket };
        Some(Pending { kind, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if c == '.' {
        Some(Pending { kind: TokenKind::Access, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if c == '?' {
        Some(Pending { kind: TokenKind::Question, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if c == ':' {
        Some(Pending { kind: TokenKind::Colon, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if c == ';' {
        Some(Pending { kind: TokenKind::Semicolon, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else if c == ',' {
        Some(Pending { kind: TokenKind::Comma, lexeme: c.to_string(), start: pos, invalid_reason: None })
    } else {
        None
    }
}

fn finish(pending: Pending, end: Pos) -> Token {
    let (kind, subkind, invalid_reason) = match pending.kind {
        TokenKind::Operator => match operator_kind(&pending.lexeme) {
            Some(op) => (TokenKind::Operator, Subkind::Operator(op), None),
            None => (
                TokenKind::Invalid,
                Subkind::None,
                Some(format!("Invalid operator {}", pending.lexeme)),
            ),
        },
        TokenKind::OpeningBracket | TokenKind::ClosingBracket => {
            let c = pending.lexeme.chars().next().unwrap();
            (pending.kind, Subkind::Bracket(bracket_kind(c)), None)
        }
        other => (other, Subkind::None, pending.invalid_reason),
    };
    Token {
        kind,
        subkind,
        lexeme: pending.lexeme,
        start: pending.start,
        end,
        invalid_reason,
    }
}

/// Tokenize an already-`prepare`d expression body. No EOF sentinel is
/// emitted; the parser synthesizes one when it runs off the end of the
/// token list.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<Pending> = None;
    let mut line = 0usize;
    let mut col = 0usize;

    for c in source.chars() {
        if c == '\n' {
            line += 1;
            col = 0;
        }

        match &mut current {
            None => {
                if !WHITESPACE.contains(c) {
                    current = start_token(c, (line, col));
                }
            }
            Some(pending) => {
                if WHITESPACE.contains(c) {
                    tokens.push(finish(current.take().unwrap(), (line, col)));
                } else {
                    match pending.kind {
                        TokenKind::Identifier => {
                            if IDENTIFIER_START.contains(c) || DIGITS.contains(c) {
                                pending.lexeme.push(c);
                            } else {
                                tokens.push(finish(current.take().unwrap(), (line, col)));
                                current = start_token(c, (line, col));
                            }
                        }
                        TokenKind::Number => {
                            if DIGITS.contains(c) || c == '.' {
                                pending.lexeme.push(c);
                            } else if IDENTIFIER_START.contains(c) {
                                pending.kind = TokenKind::Invalid;
                                pending.invalid_reason =
                                    Some(format!("Invalid character {} in number", c));
                                pending.lexeme.push(c);
                            } else {
                                tokens.push(finish(current.take().unwrap(), (line, col)));
                                current = start_token(c, (line, col));
                            }
                        }
                        TokenKind::Operator => {
                            let mut candidate = pending.lexeme.clone();
                            candidate.push(c);
                            if operator_kind(&candidate).is_some() {
                                pending.lexeme = candidate;
                            } else {
                                tokens.push(finish(current.take().unwrap(), (line, col)));
                                current = start_token(c, (line, col));
                            }
                        }
                        TokenKind::OpeningBracket | TokenKind::ClosingBracket => {
                            tokens.push(finish(current.take().unwrap(), (line, col)));
                            current = start_token(c, (line, col));
                        }
                        _ => {
                            tokens.push(finish(current.take().unwrap(), (line, col)));
                            current = start_token(c, (line, col));
                        }
                    }
                }
            }
        }
        col += 1;
    }

    if let Some(pending) = current.take() {
        tokens.push(finish(pending, (line, col)));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_arithmetic() {
        let tokens = tokenize("1 + 2 * 3");
        assert_eq!(
            kinds("1 + 2 * 3"),
            vec![
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Number
            ]
        );
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].subkind, Subkind::Operator(OperatorKind::Add));
        assert_eq!(tokens[3].subkind, Subkind::Operator(OperatorKind::Multiply));
    }

    #[test]
    fn test_two_char_operators_greedy() {
        let tokens = tokenize("a <= b && c");
        assert_eq!(tokens[1].lexeme, "<=");
        assert_eq!(tokens[1].subkind, Subkind::Operator(OperatorKind::LessThanOrEqual));
        assert_eq!(tokens[3].lexeme, "&&");
    }

    #[test]
    fn test_non_operator_pair_flushes() {
        // '+*' is not a known two-char operator, so '+' flushes before '*'.
        let tokens = tokenize("1+*2");
        assert_eq!(kinds("1+*2"), vec![
            TokenKind::Number,
            TokenKind::Operator,
            TokenKind::Operator,
            TokenKind::Number
        ]);
        assert_eq!(tokens[1].lexeme, "+");
        assert_eq!(tokens[2].lexeme, "*");
    }

    #[test]
    fn test_invalid_number() {
        let tokens = tokenize("1a");
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert!(tokens[0].invalid_reason.is_some());
    }

    #[test]
    fn test_prepare_strips_wrapper_and_lowercases() {
        assert_eq!(prepare("${Mascot.X + 10}"), "mascot.x + 10");
        assert_eq!(prepare("#{Mascot.Y}"), "mascot.y");
    }

    #[test]
    fn test_prepare_decodes_entities() {
        assert_eq!(prepare("${a &lt; b}"), "a < b");
    }

    #[test]
    fn test_prepare_patches_math_random() {
        assert_eq!(prepare("${math.random*2}"), "math.random()*2");
        assert_eq!(prepare("${math.random%2}"), "math.random%2");
    }

    #[test]
    fn test_member_access_tokens() {
        let tokens = tokenize("mascot.x");
        assert_eq!(kinds("mascot.x"), vec![TokenKind::Identifier, TokenKind::Access, TokenKind::Identifier]);
    }
}
