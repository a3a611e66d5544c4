//! Parsing and in-memory representation of romanization rules.
//!
//! A `RomRule` is a single candidate transduction from a source string to a
//! Latin target string, together with the contextual restrictions that gate
//! its applicability. Rules are loaded once from the double-colon-delimited
//! data files and are read-only from then on; see [`crate::utils`] for the
//! line-parsing primitives.

use indexmap::IndexMap;

use crate::utils::{dequote_string, robust_str_to_num, slot_value_in_double_colon_del_list};
use crate::{Uroman, Value};

/// All rules registered for a given source string, keyed by that string.
pub type RomRules = IndexMap<String, Vec<RomRule>>;

/// A single candidate transduction for a source substring.
///
/// Field names follow the data file's slot names (`s`, `t`, `lcodes`, ...)
/// rather than fuller words, matching the Python original's `RomRule`.
#[derive(Debug, Clone, Default)]
pub struct RomRule {
    pub s: String,
    pub t: Option<String>,
    pub t_alts: Vec<String>,
    pub t_at_end_of_syllable: Option<String>,
    pub prov: String,
    pub lcodes: Vec<String>,
    pub num: Option<Value>,
    pub use_only_at_start_of_word: bool,
    pub dont_use_at_start_of_word: bool,
    pub use_only_at_end_of_word: bool,
    pub dont_use_at_end_of_word: bool,
    pub use_only_for_whole_word: bool,
    pub n_restr: usize,
    pub is_minus_sign: bool,
    pub is_plus_sign: bool,
    pub is_decimal_point: bool,
    pub is_large_power: bool,
    pub fraction_connector: bool,
    pub percentage_marker: Option<String>,
    pub int_frac_connector: Option<String>,
}

impl RomRule {
    /// Builds a trivial unconditional rule, e.g. for Thai cancellation rules
    /// or Pinyin entries, where only `s`, `t`, and a provenance tag matter.
    pub fn new_simple(s: String, t: &str, prov: &str) -> Self {
        RomRule {
            s,
            t: Some(t.to_string()),
            prov: prov.to_string(),
            ..Default::default()
        }
    }

    /// True iff this rule carries no positional/language restriction at all,
    /// i.e. it applies everywhere its source string matches. Used to decide
    /// overwrite-vs-append precedence in [`Uroman::add_rom_rule`].
    pub fn is_unconditional(&self) -> bool {
        self.lcodes.is_empty()
            && !self.use_only_at_start_of_word
            && !self.dont_use_at_start_of_word
            && !self.use_only_at_end_of_word
            && !self.dont_use_at_end_of_word
            && !self.use_only_for_whole_word
    }

    /// Parses one line of a resource file into a `RomRule`.
    ///
    /// `file_format` is either `"rom"` (`romanization-auto-table.txt` /
    /// `romanization-table.txt`, slots `s`/`t`/...) or `"u2r"`
    /// (`UnicodeDataOverwrite.txt`, slots `u`/`r`/...). The caller
    /// (`Uroman::load_rom_file`) has already registered any `name`/`pic`/
    /// `tone-mark`/`syllable-info` slots from `u2r` lines into `uroman.dict_str`
    /// before calling this function.
    pub fn from_line(
        line: &str,
        provenance: &str,
        file_format: &str,
        uroman: &Uroman,
    ) -> Option<RomRule> {
        let (s, t) = if file_format == "u2r" {
            let u_str = slot_value_in_double_colon_del_list(line, "u")?;
            let cp = u32::from_str_radix(dequote_string(u_str), 16).ok()?;
            let s = char::from_u32(cp)?.to_string();
            let t = slot_value_in_double_colon_del_list(line, "r").map(dequote_string);
            (s, t.map(str::to_string))
        } else {
            let s = slot_value_in_double_colon_del_list(line, "s").map(dequote_string)?;
            let t = slot_value_in_double_colon_del_list(line, "t").map(dequote_string);
            (s.to_string(), t.map(str::to_string))
        };

        let t_at_end_of_syllable = if file_format == "u2r" {
            None
        } else {
            slot_value_in_double_colon_del_list(line, "t-end-of-syllable")
                .map(dequote_string)
                .map(str::to_string)
        };

        let num = slot_value_in_double_colon_del_list(line, "num").and_then(robust_str_to_num);

        let is_minus_sign =
            utils_has(line, "is-minus-sign");
        let is_plus_sign = utils_has(line, "is-plus-sign");
        let is_decimal_point = utils_has(line, "is-decimal-point");
        let is_large_power = utils_has(line, "is-large-power");
        let fraction_connector = utils_has(line, "fraction-connector");
        let percentage_marker = slot_value_in_double_colon_del_list(line, "percentage-marker")
            .map(str::to_string);
        let int_frac_connector = slot_value_in_double_colon_del_list(line, "int-frac-connector")
            .map(str::to_string);

        let lcodes: Vec<String> = slot_value_in_double_colon_del_list(line, "lcode")
            .map(|s| {
                s.split([',', ';'])
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let use_only_at_start_of_word = utils_has(line, "use-only-at-start-of-word");
        let dont_use_at_start_of_word = utils_has(line, "dont-use-at-start-of-word");
        let use_only_at_end_of_word = utils_has(line, "use-only-at-end-of-word");
        let dont_use_at_end_of_word = utils_has(line, "dont-use-at-end-of-word");
        let use_only_for_whole_word = utils_has(line, "use-only-for-whole-word");

        let t_alts: Vec<String> = slot_value_in_double_colon_del_list(line, "t-alt")
            .map(|s| {
                s.split([',', ';'])
                    .map(|a| dequote_string(a.trim()).to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // `second_rom_filter` mimics the Python loader's pass that collapses
        // multi-word Unicode-derived glosses down to a trailing Latin token,
        // or falls back to the original character if the gloss still has
        // internal whitespace after that.
        let t = match uroman.second_rom_filter(&s, t.as_deref()) {
            Some(t_mod) => Some(t_mod),
            None => t,
        };

        if t.is_none()
            && num.is_none()
            && !is_minus_sign
            && !is_plus_sign
            && !is_decimal_point
            && !is_large_power
            && !fraction_connector
            && percentage_marker.is_none()
            && int_frac_connector.is_none()
        {
            return None;
        }

        let restrictions = [
            !lcodes.is_empty(),
            use_only_at_start_of_word,
            dont_use_at_start_of_word,
            use_only_at_end_of_word,
            dont_use_at_end_of_word,
            use_only_for_whole_word,
        ];
        let n_restr = restrictions.iter().filter(|r| **r).count();

        let provenance = if t.is_none() && num.is_some() && provenance == "rom" {
            "num"
        } else {
            provenance
        };

        Some(RomRule {
            s,
            t,
            t_alts,
            t_at_end_of_syllable,
            prov: provenance.to_string(),
            lcodes,
            num,
            use_only_at_start_of_word,
            dont_use_at_start_of_word,
            use_only_at_end_of_word,
            dont_use_at_end_of_word,
            use_only_for_whole_word,
            n_restr,
            is_minus_sign,
            is_plus_sign,
            is_decimal_point,
            is_large_power,
            fraction_connector,
            percentage_marker,
            int_frac_connector,
        })
    }
}

fn utils_has(line: &str, slot: &str) -> bool {
    slot_value_in_double_colon_del_list(line, slot).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_rom_rule() {
        let uroman = Uroman::new();
        let line = "::s \u{0915} ::t k ::t-alt kh";
        let rule = RomRule::from_line(line, "man", "rom", &uroman).unwrap();
        assert_eq!(rule.s, "\u{0915}");
        assert_eq!(rule.t.as_deref(), Some("k"));
        assert_eq!(rule.t_alts, vec!["kh".to_string()]);
        assert_eq!(rule.n_restr, 0);
        assert!(rule.is_unconditional());
    }

    #[test]
    fn parses_lcode_restricted_rule() {
        let uroman = Uroman::new();
        let line = "::s \u{0430} ::t a ::lcode rus,ukr ::dont-use-at-start-of-word";
        let rule = RomRule::from_line(line, "man", "rom", &uroman).unwrap();
        assert_eq!(rule.lcodes, vec!["rus".to_string(), "ukr".to_string()]);
        assert!(rule.dont_use_at_start_of_word);
        assert_eq!(rule.n_restr, 2);
        assert!(!rule.is_unconditional());
    }

    #[test]
    fn parses_u2r_rule() {
        let uroman = Uroman::new();
        let line = "::u 0915 ::r k ::name DEVANAGARI LETTER KA";
        let rule = RomRule::from_line(line, "ow", "u2r", &uroman).unwrap();
        assert_eq!(rule.s, "\u{0915}");
        assert_eq!(rule.t.as_deref(), Some("k"));
    }

    #[test]
    fn skips_line_with_no_payload() {
        let uroman = Uroman::new();
        let line = "::s \u{0041}";
        assert!(RomRule::from_line(line, "man", "rom", &uroman).is_none());
    }

    #[test]
    fn num_only_rule_gets_num_provenance() {
        let uroman = Uroman::new();
        let line = "::s \u{0030} ::num 0";
        let rule = RomRule::from_line(line, "rom", "rom", &uroman).unwrap();
        assert_eq!(rule.prov, "num");
        assert!(matches!(rule.num, Some(Value::Int(0))));
    }
}
