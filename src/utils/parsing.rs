//! Split-token helpers used by the game-text parser. Game screens are
//! column oriented so most values are addressed as 1-based whitespace
//! parameters, often with thousands separators.

use regex::Regex;
use std::{num::ParseIntError, sync::OnceLock};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),

    #[error("not enough data parts")]
    NotEnoughParts,
}

/// Splits the line into its whitespace separated parameters
pub fn params(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Obtains the 1-based parameter at `index`
pub fn param<'a>(parts: &[&'a str], index: usize) -> ParseResult<&'a str> {
    if index == 0 {
        return Err(ParseError::NotEnoughParts);
    }
    parts.get(index - 1).copied().ok_or(ParseError::NotEnoughParts)
}

/// Parses the 1-based parameter at `index` as an integer, stripping
/// any thousands separators first
pub fn param_int(parts: &[&str], index: usize) -> ParseResult<i64> {
    int_commas(param(parts, index)?)
}

/// Parses an integer value that may contain comma separators and
/// trailing punctuation such as `%` or `)` left by the display
pub fn int_commas(value: &str) -> ParseResult<i64> {
    let cleaned: String = value
        .chars()
        .filter(|char| char.is_ascii_digit() || *char == '-')
        .collect();
    Ok(cleaned.parse()?)
}

/// Regex matching ANSI colour and erase escape sequences (`ESC [ ... m|K`)
fn ansi_regex() -> &'static Regex {
    static ANSI_REGEX: OnceLock<Regex> = OnceLock::new();
    ANSI_REGEX.get_or_init(|| Regex::new("\x1b\\[[0-9;]*[mK]").expect("Invalid ANSI pattern"))
}

/// Strips ANSI escape sequences from the provided line producing a
/// plain-text working copy for pattern matching
pub fn strip_ansi(line: &str) -> String {
    ansi_regex().replace_all(line, "").into_owned()
}

#[cfg(test)]
mod test {
    use super::{int_commas, param, param_int, params, strip_ansi};

    #[test]
    fn test_params_1_based() {
        let parts = params("Sector  : 123 in Sol");
        assert_eq!(param(&parts, 1).unwrap(), "Sector");
        assert_eq!(param(&parts, 3).unwrap(), "123");
        assert!(param(&parts, 9).is_err());
    }

    #[test]
    fn test_int_commas() {
        assert_eq!(int_commas("1,200").unwrap(), 1200);
        assert_eq!(int_commas("5%").unwrap(), 5);
        assert_eq!(int_commas("(3)").unwrap(), 3);
        assert!(int_commas("abc").is_err());
    }

    #[test]
    fn test_param_int() {
        let parts = params("Mines   : 50 (Type 1 Armid) owned by you");
        assert_eq!(param_int(&parts, 3).unwrap(), 50);
    }

    #[test]
    fn test_strip_ansi() {
        let line = "\x1b[1;33mSector\x1b[0m  : 5\x1b[K";
        assert_eq!(strip_ansi(line), "Sector  : 5");
    }
}
