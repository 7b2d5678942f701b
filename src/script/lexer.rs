//! Tokenizer for the (already preprocessed) script source.

use super::{ScriptError, ScriptResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier: a command name, word operator or constant
    Ident(String),
    /// `$name` variable reference
    Var(String),
    /// `:name` label; synthetic labels keep their extra colon (`:1`
    /// for `::1`) so they can never collide with source labels
    Label(String),
    Str(String),
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    AmpEq,
    PlusPlus,
    MinusMinus,
    /// End of a source line, terminating a statement
    Eol,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub fn lex(source: &str) -> ScriptResult<Vec<Spanned>> {
    let mut tokens = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let number = index + 1;
        let mut chars = line.chars().peekable();

        // Comment lines are dropped whole
        if line.trim_start().starts_with('#') {
            continue;
        }

        while let Some(&letter) = chars.peek() {
            match letter {
                ' ' | '\t' => {
                    chars.next();
                }
                '$' => {
                    chars.next();
                    let name = take_word(&mut chars);
                    if name.is_empty() {
                        return Err(ScriptError::compile(number, "'$' without a variable name"));
                    }
                    tokens.push(Spanned {
                        token: Token::Var(name),
                        line: number,
                    });
                }
                ':' => {
                    chars.next();
                    if chars.peek() == Some(&'=') {
                        return Err(ScriptError::compile(
                            number,
                            "':=' assignment is not supported, use setVar",
                        ));
                    }
                    let mut name = String::new();
                    if chars.peek() == Some(&':') {
                        chars.next();
                        name.push(':');
                    }
                    name.push_str(&take_word(&mut chars));
                    if name.is_empty() || name == ":" {
                        return Err(ScriptError::compile(number, "':' without a label name"));
                    }
                    tokens.push(Spanned {
                        token: Token::Label(name),
                        line: number,
                    });
                }
                '"' => {
                    chars.next();
                    let mut text = String::new();
                    let mut closed = false;
                    while let Some(letter) = chars.next() {
                        match letter {
                            '"' => {
                                closed = true;
                                break;
                            }
                            '\\' => match chars.next() {
                                Some('n') => text.push('\n'),
                                Some('t') => text.push('\t'),
                                Some('r') => text.push('\r'),
                                Some('\\') => text.push('\\'),
                                Some('"') => text.push('"'),
                                Some(other) => {
                                    return Err(ScriptError::compile(
                                        number,
                                        format!("unknown escape '\\{other}'"),
                                    ));
                                }
                                None => break,
                            },
                            other => text.push(other),
                        }
                    }
                    if !closed {
                        return Err(ScriptError::compile(number, "unterminated string"));
                    }
                    tokens.push(Spanned {
                        token: Token::Str(text),
                        line: number,
                    });
                }
                '0'..='9' | '.' => {
                    let mut text = String::new();
                    while let Some(&digit) = chars.peek() {
                        if digit.is_ascii_digit() || digit == '.' {
                            text.push(digit);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let value: f64 = text
                        .parse()
                        .map_err(|_| ScriptError::compile(number, format!("bad number '{text}'")))?;
                    tokens.push(Spanned {
                        token: Token::Num(value),
                        line: number,
                    });
                }
                letter if letter.is_ascii_alphabetic() || letter == '_' => {
                    let word = take_word(&mut chars);
                    tokens.push(Spanned {
                        token: Token::Ident(word),
                        line: number,
                    });
                }
                _ => {
                    chars.next();
                    let token = match letter {
                        '+' => match chars.peek() {
                            Some('+') => {
                                chars.next();
                                Token::PlusPlus
                            }
                            Some('=') => {
                                chars.next();
                                Token::PlusEq
                            }
                            _ => Token::Plus,
                        },
                        '-' => match chars.peek() {
                            Some('-') => {
                                chars.next();
                                Token::MinusMinus
                            }
                            Some('=') => {
                                chars.next();
                                Token::MinusEq
                            }
                            _ => Token::Minus,
                        },
                        '*' => match chars.peek() {
                            Some('=') => {
                                chars.next();
                                Token::StarEq
                            }
                            _ => Token::Star,
                        },
                        '/' => match chars.peek() {
                            Some('=') => {
                                chars.next();
                                Token::SlashEq
                            }
                            _ => Token::Slash,
                        },
                        '&' => match chars.peek() {
                            Some('=') => {
                                chars.next();
                                Token::AmpEq
                            }
                            _ => Token::Amp,
                        },
                        '=' => Token::Eq,
                        '<' => match chars.peek() {
                            Some('>') => {
                                chars.next();
                                Token::Ne
                            }
                            Some('=') => {
                                chars.next();
                                Token::Le
                            }
                            _ => Token::Lt,
                        },
                        '>' => match chars.peek() {
                            Some('=') => {
                                chars.next();
                                Token::Ge
                            }
                            _ => Token::Gt,
                        },
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        '[' => Token::LBracket,
                        ']' => Token::RBracket,
                        other => {
                            return Err(ScriptError::compile(
                                number,
                                format!("unexpected character '{other}'"),
                            ));
                        }
                    };
                    tokens.push(Spanned {
                        token,
                        line: number,
                    });
                }
            }
        }

        tokens.push(Spanned {
            token: Token::Eol,
            line: number,
        });
    }

    Ok(tokens)
}

fn take_word(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut word = String::new();
    while let Some(&letter) = chars.peek() {
        if letter.is_ascii_alphanumeric() || letter == '_' {
            word.push(letter);
            chars.next();
        } else {
            break;
        }
    }
    word
}

#[cfg(test)]
mod test {
    use super::{lex, Token};

    fn tokens(source: &str) -> Vec<Token> {
        lex(source)
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            tokens("setVar $x 5"),
            vec![
                Token::Ident("setVar".to_string()),
                Token::Var("x".to_string()),
                Token::Num(5.0),
                Token::Eol,
            ]
        );
    }

    #[test]
    fn test_labels_and_synthetic_labels() {
        assert_eq!(
            tokens("GOTO ::3"),
            vec![
                Token::Ident("GOTO".to_string()),
                Token::Label(":3".to_string()),
                Token::Eol,
            ]
        );
        assert_eq!(
            tokens(":start"),
            vec![Token::Label("start".to_string()), Token::Eol]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#"ECHO "a\nb\"c""#),
            vec![
                Token::Ident("ECHO".to_string()),
                Token::Str("a\nb\"c".to_string()),
                Token::Eol,
            ]
        );
    }

    #[test]
    fn test_pascal_assignment_rejected() {
        let err = lex("$x := 5").unwrap_err();
        assert!(err.to_string().contains("setVar"));
    }

    #[test]
    fn test_comment_lines_skipped() {
        assert_eq!(tokens("# just a note"), Vec::<Token>::new());
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            tokens("$i ++"),
            vec![Token::Var("i".to_string()), Token::PlusPlus, Token::Eol]
        );
        assert_eq!(
            tokens("$i += 2"),
            vec![
                Token::Var("i".to_string()),
                Token::PlusEq,
                Token::Num(2.0),
                Token::Eol,
            ]
        );
    }
}
