//! CP437 to Unicode conversion. The low half of the code page is
//! ASCII, so control bytes and ANSI escape sequences pass through
//! untouched; only the high half is remapped.

/// Unicode equivalents for CP437 bytes 0x80..=0xFF
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

/// Converts a single CP437 byte to its Unicode character
pub fn decode_byte(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        CP437_HIGH[(byte - 0x80) as usize]
    }
}

/// Converts a CP437 byte slice into a Unicode string
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(decode_byte).collect()
}

#[cfg(test)]
mod test {
    use super::{decode, decode_byte};

    #[test]
    fn test_ascii_identity() {
        assert_eq!(decode(b"Sector  : 123"), "Sector  : 123");
    }

    #[test]
    fn test_ansi_escapes_untouched() {
        assert_eq!(decode(b"\x1b[1;33mhi\x1b[0m"), "\x1b[1;33mhi\x1b[0m");
    }

    #[test]
    fn test_box_drawing() {
        assert_eq!(decode(&[0xC9, 0xCD, 0xBB]), "╔═╗");
        assert_eq!(decode_byte(0xB0), '░');
        assert_eq!(decode_byte(0xFF), '\u{A0}');
    }
}
