//! Unicode compatibility-decomposition fallback romanization.
//!
//! Some characters are best romanized by decomposing them into the characters
//! they are built from and romanizing those instead: the vulgar fraction
//! `½` becomes `1⁄2` via its compatibility decomposition, which this module
//! then romanizes recursively into `1/2`. Circled and parenthesized numbers,
//! superscript/subscript digits used as numerals, and similar composed
//! symbols follow the same path.
//!
//! Letters are excluded: a compatibility-decomposable letter (e.g. a
//! fullwidth Latin letter) already has a direct entry in the romanization
//! tables via its Unicode name, so routing it through decomposition here
//! would only add a lower-priority duplicate edge.

use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::Uroman;

/// Attempts a decomposition-based romanization of the character at `pos`.
///
/// Returns `None` when the character has no compatibility decomposition, its
/// decomposition is trivial (a single character), or it falls in a category
/// (letters) better served by a direct romanization rule.
pub fn decomp_rom(uroman: &Uroman, lcode: Option<&str>, chars: &[char], pos: usize) -> Option<String> {
    let c = *chars.get(pos)?;
    if matches!(c.general_category_group(), GeneralCategoryGroup::Letter) {
        return None;
    }

    let decomposed: String = c.nfkd().collect();
    if decomposed.chars().count() <= 1 {
        return None;
    }

    let Ok(result) = uroman.romanize_string(&decomposed, lcode, None) else {
        return None;
    };
    let mut rom = match result {
        crate::RomanizationResult::Str(s) => s,
        _ => return None,
    };
    if rom.is_empty() {
        return None;
    }

    // Pad "23½" -> "23 1/2" when the decomposed fraction sits next to other digits.
    if uroman.get_numeric_value(c).is_some() {
        rom = rom.replace('\u{2044}', "/");
        if pos >= 1 && uroman.get_numeric_value(chars[pos - 1]).is_some() {
            rom = format!(" {rom}");
        }
        if pos + 1 < chars.len() && uroman.get_numeric_value(chars[pos + 1]).is_some() {
            rom.push(' ');
        }
    }

    Some(rom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_not_decomposed() {
        let uroman = Uroman::new();
        let chars: Vec<char> = "\u{FF21}".chars().collect(); // fullwidth A
        assert_eq!(decomp_rom(&uroman, None, &chars, 0), None);
    }

    #[test]
    fn single_char_decomposition_is_skipped() {
        let uroman = Uroman::new();
        // U+00C0 LATIN CAPITAL LETTER A WITH GRAVE: Letter, already excluded,
        // but also illustrates the "decomposition must be >1 char" guard for
        // any non-letter single-char decompositions.
        let chars: Vec<char> = "\u{00C0}".chars().collect();
        assert_eq!(decomp_rom(&uroman, None, &chars, 0), None);
    }

    #[test]
    fn vulgar_fraction_decomposes() {
        let uroman = Uroman::new();
        let chars: Vec<char> = "\u{00BD}".chars().collect(); // ½
        let rom = decomp_rom(&uroman, None, &chars, 0);
        assert_eq!(rom.as_deref(), Some("1/2"));
    }
}
