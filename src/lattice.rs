//! The romanization lattice: a character-indexed edge arena over one input
//! string, plus the algorithmic romanizers and search that turn it into a
//! best-path romanization.
//!
//! Edges are stored behind `Rc<RefCell<Edge>>` rather than by value. The
//! number aggregator (`add_numbers`) builds combined edges out of smaller
//! ones and later deactivates the edges it consumed; those edges are the
//! same objects the lattice already holds, so deactivating them has to be
//! visible through every other reference to them, exactly as it is in the
//! original Python (where edges are plain object references shared between
//! the lattice and local working lists).

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::decompositions::decomp_rom;
use crate::edge::{Edge, NumDataUpdates};
use crate::rom_rule::RomRule;
use crate::{AbugidaCacheEntry, Uroman};

type EdgeRef = Rc<RefCell<Edge>>;

static CONSONANT_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[bcdfghjklmnpqrstvwxyz]+$").unwrap());
static CONSONANT_END_NO_Y_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[bcdfghjklmnpqrstvwxz]+$").unwrap());
static VOWEL_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?i)[aeiou]").unwrap());
static VOWEL_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[aeiou]+$").unwrap());
static DOUBLE_CONSONANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ch|[bcdfghjklmnpqrstwz])").unwrap());
static PLUS_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+(m|ng|n|h|r)").unwrap());
static R_VOWEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"r[aeiou]").unwrap());
static THAI_SYLLABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[bcdfghjklmnpqrstvwxyz]+$").unwrap());
static CORE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bc:([a-z]+)\s+s:([a-z]+)\b").unwrap());
static TIBETAN_GOOD_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:|[bcdfghjklmnpqrstvwxz]|bh|bs|ch|cs|dd|ddh|dh|dz|dzh|gh|gr|gs|kh|khs|kss|n|nn|nt|ms|ng|ngs|ns|ph|rm|sh|ss|th|ts|tsh|tt|tth|zh|zhs)'?$",
    )
    .unwrap()
});
static TIBETAN_GOOD_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^'?(?:.|bd|br|brg|brgy|bs|bsh|bst|bt|bts|by|bz|bzh|ch|db|dby|dk|dm|dp|dpy|dr|gl|gn|gr|gs|gt|gy|gzh|kh|khr|khy|kr|ky|ld|lh|lt|mkh|mny|mth|mtsh|ny|ph|phr|phy|rgy|rk|el|rn|rny|rt|rts|sk|skr|sky|sl|sm|sn|sny|sp|spy|sr|st|th|ts|tsh)$",
    )
    .unwrap()
});

const THAI_O_ANG: char = '\u{0E2D}';
const JAPANESE_SMALL_TSU: char = '\u{3063}';
const KATAKANA_SMALL_TSU: char = '\u{30C3}';
const GURMUKHI_ADDAK: char = '\u{0A71}';
const JAPANESE_SMALL_Y: &str = "\u{3083}\u{3085}\u{3087}\u{30E3}\u{30E5}\u{30E7}";
const JAPANESE_VOWEL_LENGTHENER: char = '\u{30FC}';
const TIBETAN_SUBJOINED_YA: char = '\u{0FB0}';
const TIBETAN_LETTER_A_CHUNG: char = '\u{0F60}';
const BRAILLE_UPPER_MARKER: char = '\u{2820}';
const BRAILLE_SPACE: char = '\u{2800}';

fn is_letter_or_mark(c: char) -> bool {
    use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};
    matches!(
        c.general_category_group(),
        GeneralCategoryGroup::Letter | GeneralCategoryGroup::Mark
    )
}

fn is_consonant(c: char) -> bool {
    "bcdfghjklmnpqrstvwxyz".contains(c)
}

/// Character-indexed edge arena for a single romanization pass.
pub struct Lattice<'a> {
    chars: Vec<char>,
    lcode: Option<String>,
    uroman: &'a Uroman,
    max_vertex: usize,
    edges: RefCell<HashMap<(usize, usize), Vec<EdgeRef>>>,
    starts_at: RefCell<HashMap<usize, BTreeSet<usize>>>,
    ends_at: RefCell<HashMap<usize, BTreeSet<usize>>>,
    contains_script: HashSet<String>,
    preceded_by_alpha: RefCell<HashMap<usize, bool>>,
    followed_by_alpha: RefCell<HashMap<usize, bool>>,
    edge_vowel: RefCell<HashMap<usize, bool>>,
    edge_delete: RefCell<HashSet<usize>>,
    is_upper: RefCell<HashSet<usize>>,
    simple_top_rom_cache: RefCell<HashMap<(usize, usize), Option<String>>>,
}

impl<'a> Lattice<'a> {
    pub fn new(s: &str, uroman: &'a Uroman, lcode: Option<&str>) -> Self {
        let chars: Vec<char> = s.chars().collect();
        let max_vertex = chars.len();
        let mut contains_script = HashSet::new();
        for &c in &chars {
            contains_script.insert(uroman.chr_script_name(c));
            if ('\u{2800}'..='\u{28FF}').contains(&c) {
                contains_script.insert("Braille".to_string());
            }
        }
        Lattice {
            chars,
            lcode: lcode.map(str::to_string),
            uroman,
            max_vertex,
            edges: RefCell::new(HashMap::new()),
            starts_at: RefCell::new(HashMap::new()),
            ends_at: RefCell::new(HashMap::new()),
            contains_script,
            preceded_by_alpha: RefCell::new(HashMap::new()),
            followed_by_alpha: RefCell::new(HashMap::new()),
            edge_vowel: RefCell::new(HashMap::new()),
            edge_delete: RefCell::new(HashSet::new()),
            is_upper: RefCell::new(HashSet::new()),
            simple_top_rom_cache: RefCell::new(HashMap::new()),
        }
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    fn substr(&self, start: usize, end: usize) -> String {
        if start >= end || end > self.max_vertex {
            return String::new();
        }
        self.chars[start..end].iter().collect()
    }

    fn add_edge(&self, edge: Edge) -> EdgeRef {
        let start = edge.start();
        let end = edge.end();
        let edge_ref = Rc::new(RefCell::new(edge));
        self.edges
            .borrow_mut()
            .entry((start, end))
            .or_default()
            .push(edge_ref.clone());
        self.starts_at.borrow_mut().entry(start).or_default().insert(end);
        self.ends_at.borrow_mut().entry(end).or_default().insert(start);
        edge_ref
    }

    fn edges_in_span(&self, start: usize, end: usize) -> Vec<EdgeRef> {
        self.edges
            .borrow()
            .get(&(start, end))
            .cloned()
            .unwrap_or_default()
    }

    fn ends_from(&self, start: usize) -> Vec<usize> {
        self.starts_at
            .borrow()
            .get(&start)
            .map(|set| set.iter().rev().copied().collect())
            .unwrap_or_default()
    }

    fn starts_to(&self, end: usize) -> Vec<usize> {
        self.ends_at
            .borrow()
            .get(&end)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn char_is_braille(c: char) -> bool {
        ('\u{2800}'..='\u{28FF}').contains(&c)
    }

    fn char_is_subjoined_letter(&self, c: char) -> bool {
        self.uroman.chr_name(c).contains("SUBJOINED LETTER")
    }

    fn char_is_letter(&self, c: char) -> bool {
        self.uroman.chr_name(c).contains("LETTER")
    }

    fn char_is_vowel_sign(&self, c: char) -> bool {
        self.uroman.dict_bool_get("is-vowel-sign", &c.to_string())
    }

    fn char_is_letter_or_vowel_sign(&self, c: char) -> bool {
        self.char_is_letter(c) || self.char_is_vowel_sign(c)
    }

    /// True if nothing alphabetic immediately precedes `position`, whether in
    /// the source text or in whatever has already been romanized to its left.
    pub fn is_at_start_of_word(&self, position: usize) -> bool {
        if let Some(&cached) = self.preceded_by_alpha.borrow().get(&position) {
            return !cached;
        }
        let first_char_is_braille = self
            .char_at(position)
            .map(Self::char_is_braille)
            .unwrap_or(false);
        if position > 0 {
            if let Some(prev) = self.char_at(position - 1)
                && prev.is_alphabetic()
            {
                self.preceded_by_alpha.borrow_mut().insert(position, true);
                return false;
            }
        }
        for start in self.starts_to(position) {
            for edge in self.edges_in_span(start, position) {
                let edge = edge.borrow();
                let txt = edge.txt();
                if let Some(prev_letter) = txt.chars().last()
                    && (prev_letter.is_alphabetic() || (first_char_is_braille && prev_letter == '\''))
                {
                    self.preceded_by_alpha.borrow_mut().insert(position, true);
                    return false;
                }
            }
        }
        self.preceded_by_alpha.borrow_mut().insert(position, false);
        true
    }

    /// True if nothing alphabetic, and no rule with an alphabetic target that
    /// could still apply, immediately follows `position`.
    pub fn is_at_end_of_word(&self, position: usize) -> bool {
        if let Some(&cached) = self.followed_by_alpha.borrow().get(&position) {
            return !cached;
        }
        let mut start = position;
        if start < self.max_vertex
            && let Some(next) = self.char_at(start)
            && next.is_alphabetic()
        {
            self.followed_by_alpha.borrow_mut().insert(position, true);
            return false;
        }
        while start + 1 < self.max_vertex
            && self.char_at(start).is_some_and(|c| self.uroman.char_is_nonspacing_mark(c))
            && self.uroman.chr_name(self.chars[start]).contains("NUKTA")
        {
            start += 1;
        }
        for end in (start + 1)..=self.max_vertex {
            let s = self.substr(start, end);
            if !self.uroman.dict_bool_get("s-prefix", &s) {
                break;
            }
            if let Some(rules) = self.uroman.rom_rules.get(&s) {
                for rule in rules {
                    if let Some(rom) = &rule.t
                        && !rule.use_only_at_start_of_word
                        && rom.chars().any(|c| c.is_alphabetic())
                    {
                        self.followed_by_alpha.borrow_mut().insert(position, true);
                        return false;
                    }
                }
            }
        }
        self.followed_by_alpha.borrow_mut().insert(position, false);
        true
    }

    fn is_at_end_of_syllable(&self, position: usize) -> (bool, &'static str) {
        let prev_char = if position >= 2 { self.char_at(position - 2) } else { None };
        let mut next_char = if position < self.max_vertex { self.char_at(position) } else { None };
        let mut adj_position = position;
        if let Some(nc) = next_char
            && !self.uroman.dict_str_get("tone-mark", nc).is_empty()
        {
            adj_position = position + 1;
            next_char = if adj_position < self.max_vertex { self.char_at(adj_position) } else { None };
        }
        let next_char2 = if adj_position + 1 < self.max_vertex { self.char_at(adj_position + 1) } else { None };

        let Some(prev_char) = prev_char else {
            return (false, "start-of-string");
        };
        if !is_letter_or_mark(prev_char) {
            return (false, "start-of-token");
        }
        if self.uroman.dict_str_get("syllable-info", prev_char) == "written-pre-consonant-spoken-post-consonant" {
            return (false, "pre-post-vowel-on-left");
        }
        if let Some(nc) = next_char
            && self.uroman.dict_str_get("syllable-info", nc) == "written-pre-consonant-spoken-post-consonant"
        {
            return (true, "pre-post-vowel-on-right");
        }
        if adj_position >= self.max_vertex {
            return (true, "end-of-string");
        }
        if !next_char.is_some_and(is_letter_or_mark) {
            return (true, "end-of-token");
        }
        if position > 0
            && let Some(left_edge) = self.best_left_neighbor_edge(position - 1, false)
            && CONSONANT_END_RE.is_match(left_edge.borrow().txt())
        {
            return (false, "consonant-to-the-left");
        }
        let next_char_rom = self
            .simple_top_romanization_candidate_for_span(adj_position, adj_position + 2, true)
            .or_else(|| self.simple_top_romanization_candidate_for_span(adj_position, adj_position + 1, true))
            .unwrap_or_else(|| "?".to_string());
        if !VOWEL_START_RE.is_match(&next_char_rom.to_lowercase()) {
            return (true, "not-followed-by-vowel");
        }
        if next_char == Some(THAI_O_ANG) && next_char2.is_some() {
            let next_char2_rom = self
                .simple_top_romanization_candidate_for_span(adj_position + 1, adj_position + 2, true)
                .or_else(|| self.simple_top_romanization_candidate_for_span(adj_position + 1, adj_position + 2, true))
                .unwrap_or_else(|| "?".to_string());
            if VOWEL_START_RE.is_match(&next_char2_rom.to_lowercase()) {
                return (true, "o-ang-followed-by-vowel");
            }
        }
        (false, "not-at-syllable-end-by-default")
    }

    fn romanization_by_first_rule(&self, s: &str) -> Option<String> {
        self.uroman.rom_rules.get(s)?.first()?.t.clone()
    }

    fn expand_rom_with_special_chars(
        &self,
        rom: String,
        start: usize,
        end: usize,
    ) -> (String, usize, usize, Option<String>) {
        let orig_start = start;
        let mut start = start;
        let mut end = end;
        let mut rom = rom;
        if rom.is_empty() {
            return (rom, start, end, None);
        }
        let mut prev_char = if start >= 1 { self.char_at(start - 1) } else { None };
        let mut last_char = self.char_at(end - 1).unwrap_or(' ');
        let mut next_char = if end < self.max_vertex { self.char_at(end) } else { None };

        if prev_char == Some(BRAILLE_UPPER_MARKER) && rom.starts_with(|c: char| c.is_ascii_lowercase()) {
            let mut chars: Vec<char> = rom.chars().collect();
            chars[0] = chars[0].to_ascii_uppercase();
            let new_rom: String = chars.into_iter().collect();
            return (new_rom, start - 1, end, Some("rom exp".to_string()));
        }

        if start + 1 == end
            && !rom.is_empty()
            && rom.chars().all(|c| !c.is_lowercase())
            && rom.chars().any(|c| c.is_uppercase())
            && next_char.is_some_and(|c| c.is_lowercase())
        {
            rom = capitalize(&rom);
        }

        // Japanese small tsu / Gurmukhi addak: consonant doubling.
        if let Some(pc) = prev_char
            && (pc == JAPANESE_SMALL_TSU || pc == KATAKANA_SMALL_TSU || pc == GURMUKHI_ADDAK)
            && let Some(cap) = DOUBLE_CONSONANT_RE.find(&rom)
        {
            let matched = cap.as_str();
            let prefix = if pc == JAPANESE_SMALL_TSU || pc == KATAKANA_SMALL_TSU {
                matched.replace("ch", "t")
            } else {
                matched.replace("ch", "c")
            };
            rom = format!("{prefix}{rom}");
            start -= 1;
            prev_char = if start >= 1 { self.char_at(start - 1) } else { None };
        }

        // Thai.
        if self.char_at(start).map(|c| self.uroman.chr_script_name(c)) == Some("Thai".to_string()) {
            if start + 1 == end && THAI_SYLLABLE_RE.is_match(&rom) {
                if prev_char.is_some_and(|pc| {
                    self.uroman.dict_str_get("syllable-info", pc) == "written-pre-consonant-spoken-post-consonant"
                }) {
                    let vowel_prefix_len = 1usize;
                    if vowel_prefix_len <= start {
                        for vowel_suffix_len in [3usize, 2, 1] {
                            if end + vowel_suffix_len <= self.max_vertex {
                                let pattern = format!(
                                    "{}\u{2013}{}",
                                    self.substr(start - vowel_prefix_len, start),
                                    self.substr(end, end + vowel_suffix_len)
                                );
                                if let Some(vowel_rom) = self.romanization_by_first_rule(&pattern) {
                                    return (
                                        format!("{rom}{vowel_rom}"),
                                        start - vowel_prefix_len,
                                        end + vowel_suffix_len,
                                        Some("rom exp".to_string()),
                                    );
                                }
                            }
                        }
                    }
                }
            }
            if prev_char.map(|c| self.uroman.chr_script_name(c)) == Some("Thai".to_string())
                && prev_char.is_some_and(|pc| {
                    self.uroman.dict_str_get("syllable-info", pc) == "written-pre-consonant-spoken-post-consonant"
                })
                && rom.starts_with(is_consonant)
                && let Some(pc) = prev_char
                && let Some(vowel_rom) = self.romanization_by_first_rule(&pc.to_string())
            {
                return (format!("{rom}{vowel_rom}"), start - 1, end, Some("rom exp".to_string()));
            }
            if self.char_at(start) == Some(THAI_O_ANG) && end - start == 1 {
                let prev_script = prev_char.map(|c| self.uroman.chr_script_name(c)).unwrap_or_default();
                let next_script = next_char.map(|c| self.uroman.chr_script_name(c)).unwrap_or_default();
                let prev_rom = self.find_rom_edge_path_backwards_str(0, start, Some(1));
                let next_rom = next_char.and_then(|c| self.romanization_by_first_rule(&c.to_string())).unwrap_or_default();
                if !(prev_script == "Thai"
                    && next_script == "Thai"
                    && CONSONANT_END_NO_Y_RE.is_match(&prev_rom)
                    && CONSONANT_END_NO_Y_RE.is_match(&next_rom))
                {
                    return (String::new(), start, end, Some("rom del".to_string()));
                }
            }
        }

        // Coptic: consonant + grave accent = e + consonant.
        if next_char == Some('\u{0300}')
            && self.uroman.chr_script_name(last_char) == "Coptic"
            && self.simple_top_romanization_candidate_for_span(orig_start, end + 1, false).is_none()
        {
            rom = format!("e{rom}");
            end += 1;
            last_char = self.char_at(end - 1).unwrap_or(' ');
            next_char = if end < self.max_vertex { self.char_at(end) } else { None };
            return (rom, start, end, Some("rom exp".to_string()));
        }

        // Japanese small y: ki + small ya -> kya.
        if let Some(nc) = next_char
            && JAPANESE_SMALL_Y.contains(nc)
            && self.uroman.chr_script_name(last_char) == self.uroman.chr_script_name(nc)
            && rom.chars().rev().nth(1).is_some_and(is_consonant)
            && rom.ends_with('i')
            && let Some(y_rom) = self.romanization_by_first_rule(&nc.to_string())
            && self.simple_top_romanization_candidate_for_span(orig_start, end + 1, false).is_none()
            && self.simple_top_romanization_candidate_for_span(start, end + 1, false).is_none()
        {
            let mut rom2 = rom.clone();
            rom2.pop();
            rom2.push_str(&y_rom);
            return (rom2, start, end + 1, Some("rom exp".to_string()));
        }

        // Japanese vowel lengthener.
        if next_char == Some(JAPANESE_VOWEL_LENGTHENER) {
            let script = self.uroman.chr_script_name(last_char);
            if let Some(last_rom_char) = rom.chars().last()
                && (script == "Hiragana" || script == "Katakana")
                && "aeiou".contains(last_rom_char)
            {
                return (format!("{rom}{last_rom_char}"), start, end + 1, Some("rom exp".to_string()));
            }
        }

        // Virama.
        if next_char.is_some_and(|c| self.uroman.dict_bool_get("is-virama", &c.to_string())) {
            return (rom, start, end + 1, Some("rom exp".to_string()));
        }

        if rom.starts_with(' ') && (start == 0 || prev_char == Some(' ')) {
            rom.remove(0);
        }
        if rom.ends_with(' ') && (end == self.max_vertex + 1 || next_char == Some(' ')) {
            rom.pop();
        }
        (rom, start, end, None)
    }

    pub fn prep_braille(&self) {
        if !self.contains_script.contains("Braille") {
            return;
        }
        let mut all_caps = false;
        for i in 0..self.chars.len() {
            let c = self.chars[i];
            if i >= 1 && self.chars[i - 1] == BRAILLE_UPPER_MARKER && c == BRAILLE_UPPER_MARKER {
                all_caps = true;
            } else if all_caps {
                if c == BRAILLE_SPACE {
                    all_caps = false;
                } else {
                    self.is_upper.borrow_mut().insert(i);
                }
            }
        }
    }

    pub fn pick_tibetan_vowel_edge(&self) {
        if !self.contains_script.contains("Tibetan") {
            return;
        }
        let mut syllables: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        for start in 0..self.max_vertex {
            let c = self.chars[start];
            if self.uroman.chr_script_name(c) == "Tibetan" && self.char_is_letter_or_vowel_sign(c) {
                current.push(start);
            } else if !current.is_empty() {
                syllables.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            syllables.push(current);
        }

        for positions in syllables {
            let mut vowel_pos: Option<usize> = None;
            let mut roms: Vec<String> = Vec::new();
            let mut subjoined_positions: Vec<usize> = Vec::new();
            let first_letter_position = positions[0];
            for &i in &positions {
                let c = self.chars[i];
                let mut rom = self
                    .simple_top_romanization_candidate_for_span(i, i + 1, false)
                    .unwrap_or_else(|| "?".to_string());
                self.edge_vowel.borrow_mut().remove(&i);
                if self.char_is_vowel_sign(c) || VOWEL_END_RE.is_match(&rom) {
                    vowel_pos = Some(i);
                    self.edge_vowel.borrow_mut().insert(i, true);
                    if roms.last().map(String::as_str) == Some("'") && i > 0 {
                        self.edge_delete.borrow_mut().insert(i - 1);
                    }
                } else if self.char_is_subjoined_letter(c) {
                    subjoined_positions.push(i);
                    if i > first_letter_position {
                        if c == TIBETAN_SUBJOINED_YA {
                            vowel_pos = Some(i - 1);
                            self.edge_vowel.borrow_mut().insert(i - 1, true);
                        } else {
                            self.edge_vowel.borrow_mut().insert(i - 1, false);
                        }
                    }
                    rom = strip_tibetan_trailing_a(&rom);
                } else if c == TIBETAN_LETTER_A_CHUNG {
                    self.edge_vowel.borrow_mut().insert(i, false);
                    if i > first_letter_position {
                        vowel_pos = Some(i - 1);
                        self.edge_vowel.borrow_mut().insert(i - 1, true);
                        if i == *positions.last().unwrap() {
                            self.edge_delete.borrow_mut().insert(i);
                        }
                    }
                    rom = if roms.last().is_some_and(|r| !"aeiou".contains(r.as_str())) {
                        "a'".to_string()
                    } else {
                        "'".to_string()
                    };
                } else {
                    rom = strip_tibetan_trailing_a(&rom);
                }
                roms.push(rom);
            }

            if vowel_pos.is_some() {
                for &i in &positions {
                    self.edge_vowel.borrow_mut().entry(i).or_insert(false);
                }
                continue;
            }

            let mut best_cost = f64::INFINITY;
            let mut best_vowel_pos: Option<usize> = None;
            let n_letters = positions.len();
            for &i in &positions {
                let rel_pos = i - first_letter_position;
                let pre: String = roms[..=rel_pos].concat();
                let post: String = roms[rel_pos + 1..].concat();
                let cost = if self.edge_vowel.borrow().get(&i) == Some(&false) {
                    20.0
                } else if n_letters == 1 {
                    0.0
                } else if n_letters == 2 {
                    if i == 0 { 0.0 } else { 0.1 }
                } else {
                    let good_suffix = TIBETAN_GOOD_SUFFIX_RE.is_match(&post);
                    let good_prefix = TIBETAN_GOOD_PREFIX_RE.is_match(&pre);
                    let subjoined_suffix = positions[rel_pos + 2..]
                        .iter()
                        .all(|p| subjoined_positions.contains(p));
                    if good_suffix && good_prefix {
                        pre.chars().count() as f64 * 0.1
                    } else if good_suffix {
                        pre.chars().count() as f64
                    } else if subjoined_suffix && good_prefix {
                        pre.chars().count() as f64 * 0.3
                    } else if subjoined_suffix {
                        pre.chars().count() as f64 * 0.5
                    } else {
                        f64::INFINITY
                    }
                };
                if cost < best_cost {
                    best_cost = cost;
                    best_vowel_pos = Some(i);
                }
            }
            if let Some(best) = best_vowel_pos {
                for &i in &positions {
                    self.edge_vowel.borrow_mut().entry(i).or_insert(i == best);
                }
            }
        }
    }

    fn add_default_abugida_vowel(&self, rom: String, start: usize, end: usize, annotation: &str) -> String {
        let Some(first_s_char) = self.char_at(start) else { return rom };
        let Some(last_s_char) = (end > 0).then(|| self.char_at(end - 1)).flatten() else { return rom };
        let script_name = self.uroman.chr_script_name(first_s_char);
        let Some(script) = self.uroman.scripts_get(&script_name.to_lowercase()) else { return rom };
        if script.abugida_default_vowels.is_empty() {
            return rom;
        }

        let cache_key = (script_name.to_lowercase(), rom.clone());
        let cached = self.uroman.abugida_cache_get(&cache_key);
        let (base_rom, base_rom_plus_vowel, rom) = if let Some(entry) = cached {
            (entry.base_rom.clone(), entry.base_rom_plus_vowel.clone(), entry.modified_rom.clone())
        } else {
            let (base_rom, base_rom_plus_vowel, mut rom) = match &script.abugida_regexes {
                Some((re_y, re_general)) => {
                    if let Some(cap) = re_y.captures(&rom) {
                        let base = cap.get(1).unwrap().as_str().to_string();
                        let plus_vowel = format!("{}{}", base, cap.get(2).unwrap().as_str());
                        (Some(base), Some(plus_vowel), rom.clone())
                    } else if let Some(cap) = re_general.captures(&rom) {
                        let base = cap.get(1).unwrap().as_str().to_string();
                        let plus_vowel = format!("{}{}", base, cap.get(2).unwrap().as_str());
                        let mut r = rom.clone();
                        if r.ends_with('-') && start + 1 == end && r.chars().next().is_some_and(|c| c.is_alphabetic()) {
                            r.pop();
                        }
                        (Some(base), Some(plus_vowel), r)
                    } else {
                        let base = rom.clone();
                        let plus_vowel = format!("{}{}", base, script.abugida_default_vowels[0]);
                        (Some(base), Some(plus_vowel), rom.clone())
                    }
                }
                None => {
                    let base = rom.clone();
                    let plus_vowel = format!("{}{}", base, script.abugida_default_vowels[0]);
                    (Some(base), Some(plus_vowel), rom.clone())
                }
            };
            let (base_rom, base_rom_plus_vowel) = match &base_rom {
                Some(b)
                    if !CONSONANT_END_RE.is_match(&format!("{b}$")) && b.chars().all(is_consonant)
                        || (script_name == "Tibetan" && b == "'") => {
                    (base_rom, base_rom_plus_vowel)
                }
                Some(b) if b.chars().all(is_consonant) || (script_name == "Tibetan" && b == "'") => {
                    (base_rom, base_rom_plus_vowel)
                }
                _ => (None, None),
            };
            self.uroman.abugida_cache_set(
                cache_key,
                base_rom.clone(),
                base_rom_plus_vowel.clone(),
                rom.clone(),
            );
            let _ = &mut rom;
            (base_rom, base_rom_plus_vowel, rom)
        };

        let Some(base_rom) = base_rom else { return rom };
        if annotation.contains("tail") {
            return rom;
        }
        let base_rom_plus_vowel = base_rom_plus_vowel.unwrap_or_else(|| base_rom.clone());
        let prev_s_char = if start >= 1 { self.char_at(start - 1) } else { None };
        let next_s_char = self.char_at(end);
        let next2_s_char = self.char_at(end + 1);

        if script_name == "Tibetan" {
            if self.edge_delete.borrow().contains(&start) {
                return String::new();
            }
            return if self.edge_vowel.borrow().get(&start) == Some(&true) {
                base_rom_plus_vowel
            } else {
                base_rom
            };
        }
        if let Some(nc) = next_s_char
            && (base_rom.chars().all(|c| "bcdfghklmnpqrstvwz".contains(c)) || base_rom == "ng")
            && nc == '\u{17D2}'
        {
            return base_rom;
        }
        if next_s_char.is_some_and(|c| self.uroman.dict_bool_get("is-vowel-sign", &c.to_string())) {
            return base_rom;
        }
        if next_s_char.is_some_and(|c| self.uroman.dict_bool_get("is-medial-consonant-sign", &c.to_string())) {
            return base_rom;
        }
        if next_s_char.is_some_and(|c| self.char_is_subjoined_letter(c)) {
            return base_rom;
        }
        if next_s_char.is_some_and(|c| self.uroman.char_is_nonspacing_mark(c))
            && next2_s_char.is_some_and(|c| self.uroman.dict_bool_get("is-vowel-sign", &c.to_string()))
        {
            return base_rom;
        }
        if next_s_char.is_some_and(|c| self.uroman.dict_bool_get("is-virama", &c.to_string())) {
            return base_rom;
        }
        if next_s_char.is_some_and(|c| self.uroman.char_is_nonspacing_mark(c))
            && next2_s_char.is_some_and(|c| self.uroman.dict_bool_get("is-virama", &c.to_string()))
        {
            return base_rom;
        }
        if prev_s_char.is_some_and(|c| self.uroman.dict_bool_get("is-virama", &c.to_string())) {
            return base_rom_plus_vowel;
        }
        if self.is_at_start_of_word(start) && !R_VOWEL_RE.is_match(&rom) {
            return base_rom_plus_vowel;
        }
        if self.is_at_end_of_word(end) {
            if script_name == "Devanagari" && self.lcode.as_deref() != Some("san") {
                return rom;
            } else if matches!(self.lcode.as_deref(), Some("asm" | "ben" | "guj" | "kas" | "pan")) {
                return rom;
            } else {
                return base_rom_plus_vowel;
            }
        }
        if prev_s_char.map(|c| self.uroman.chr_script_name(c)) != Some(script_name.clone()) {
            return base_rom_plus_vowel;
        }
        if self.uroman.chr_name(last_s_char).contains("VOCALIC") {
            return base_rom;
        }
        if next_s_char.map(|c| self.uroman.chr_script_name(c)) == Some(script_name) {
            return base_rom_plus_vowel;
        }
        rom
    }

    fn cand_is_valid(&self, rule: &RomRule, start: usize, end: usize) -> bool {
        if rule.t.is_none() && rule.num.is_none() {
            return false;
        }
        if rule.dont_use_at_start_of_word && self.is_at_start_of_word(start) {
            return false;
        }
        if rule.use_only_at_start_of_word && !self.is_at_start_of_word(start) {
            return false;
        }
        if rule.dont_use_at_end_of_word && self.is_at_end_of_word(end) {
            return false;
        }
        if rule.use_only_at_end_of_word && !self.is_at_end_of_word(end) {
            return false;
        }
        if rule.use_only_for_whole_word && !(self.is_at_start_of_word(start) && self.is_at_end_of_word(end)) {
            return false;
        }
        if !rule.lcodes.is_empty() && !rule.lcodes.iter().any(|lc| Some(lc.as_str()) == self.lcode.as_deref()) {
            return false;
        }
        true
    }

    fn simple_top_romanization_candidate_for_span(
        &self,
        start: usize,
        end: usize,
        simple_search: bool,
    ) -> Option<String> {
        if end > self.max_vertex {
            return None;
        }
        let span = (start, end);
        if let Some(cached) = self.simple_top_rom_cache.borrow().get(&span) {
            return cached.clone();
        }
        let s = self.substr(start, end);
        let mut best: Option<(&str, usize, &RomRule)> = None;
        if let Some(rules) = self.uroman.rom_rules.get(&s) {
            for rule in rules {
                let Some(t) = &rule.t else { continue };
                if self.cand_is_valid(rule, start, end) {
                    let n_restr = rule.n_restr;
                    if best.is_none_or(|(_, best_n, _)| n_restr > best_n) {
                        best = Some((t.as_str(), n_restr, rule));
                    }
                }
            }
        }
        if simple_search {
            return best.map(|(t, _, _)| t.to_string());
        }
        let mut best_cand = best.map(|(t, _, _)| t.to_string());
        if let Some((_, _, rule)) = best {
            if let Some(t_eos) = &rule.t_at_end_of_syllable {
                let (is_eos, _) = self.is_at_end_of_syllable(end);
                if is_eos {
                    best_cand = Some(t_eos.clone());
                }
            }
        }
        self.simple_top_rom_cache.borrow_mut().insert(span, best_cand.clone());
        best_cand
    }

    fn decomp_rom_at(&self, pos: usize) -> Option<String> {
        decomp_rom(self.uroman, self.lcode.as_deref(), &self.chars, pos)
    }

    pub fn add_romanization(&self) {
        for start in 0..self.max_vertex {
            for end in (start + 1)..=self.max_vertex {
                let s = self.substr(start, end);
                if !self.uroman.dict_bool_get("s-prefix", &s) {
                    break;
                }
                if let Some(rom) = self.simple_top_romanization_candidate_for_span(start, end, false) {
                    let mut rom = rom;
                    if self.contains_script.contains("Braille")
                        && start + 1 == end
                        && self.is_upper.borrow().contains(&start)
                    {
                        rom = rom.to_uppercase();
                    }
                    let mut annotation = "rom".to_string();
                    if let Some(m) = PLUS_PREFIX_RE.find(&rom) {
                        let _ = m;
                        rom = rom[1..].to_string();
                        annotation = "rom tail".to_string();
                    }
                    let new_rom = self.add_default_abugida_vowel(rom.clone(), start, end, &annotation);
                    if let Some(suffix) = new_rom.strip_prefix(&rom)
                        && !suffix.is_empty()
                        && suffix.chars().all(|c| "aeiou".contains(c))
                    {
                        annotation = format!("{annotation} c:{rom} s:{suffix}");
                    }
                    let rom = new_rom;
                    let (rom2, start2, end2, exp_annotation) = self.expand_rom_with_special_chars(rom, start, end);
                    let annotation = exp_annotation.unwrap_or(annotation);
                    self.add_edge(Edge::new_regular(start2, end2, rom2, annotation));
                }
            }
            let char = self.chars[start];
            let cp = char as u32;
            if (0xAC00..=0xD7A3).contains(&cp)
                && let Some(rom) = self.uroman.unicode_hangul_romanization(char)
            {
                self.add_edge(Edge::new_regular(start, start + 1, rom, "rom".to_string()));
            }
            if let Some(rom_decomp) = self.decomp_rom_at(start) {
                self.add_edge(Edge::new_regular(start, start + 1, rom_decomp, "rom decomp".to_string()));
            }
        }
    }

    fn edge_is_digit(edge: &EdgeRef) -> bool {
        let e = edge.borrow();
        e.r#type() == "digit"
            && e.end() - e.start() == 1
            && matches!(e.value(), Some(v) if v.fract() == 0.0 && (0.0..=9.0).contains(&v))
    }

    fn is_gap_null_edge(edge: &EdgeRef) -> bool {
        matches!(edge.borrow().orig_txt(), "\u{96F6}" | "\u{3007}")
    }

    fn braille_digit(c: char) -> Option<char> {
        "\u{281A}\u{2801}\u{2803}\u{2809}\u{2819}\u{2811}\u{280B}\u{281B}\u{2813}\u{280A}"
            .chars()
            .position(|d| d == c)
            .map(|p| char::from_digit(p as u32, 10).unwrap())
    }

    fn add_braille_number(&self, start: usize, end: usize, txt: String) {
        let orig = self.substr(start, end);
        let mut edge = Edge::new_combined_numeric(
            start,
            end,
            txt.parse::<f64>().unwrap_or(0.0),
            "number".to_string(),
            None,
            None,
            None,
            orig,
        );
        edge.update(NumDataUpdates { value_s: Some(txt), ..Default::default() });
        self.add_edge(edge);
    }

    pub fn add_braille_numbers(&self) {
        if !self.contains_script.contains("Braille") {
            return;
        }
        let mut num_s = String::new();
        let mut start: Option<usize> = None;
        for i in 0..self.chars.len() {
            let c = self.chars[i];
            if c == '\u{283C}' {
                if start.is_none() {
                    start = Some(i);
                }
            } else if start.is_some() && let Some(digit) = Self::braille_digit(c) {
                num_s.push(digit);
            } else if start.is_some() && c == '\u{2832}' {
                num_s.push('.');
            } else if start.is_some() && c == '\u{2802}' {
                num_s.push(',');
            } else if let Some(s) = start
                && !num_s.is_empty()
            {
                self.add_braille_number(s, i, std::mem::take(&mut num_s));
                start = None;
            }
        }
        if let Some(s) = start
            && !num_s.is_empty()
        {
            self.add_braille_number(s, self.chars.len(), num_s);
        }
    }

    pub fn add_numbers(&self) {
        let uroman = self.uroman;
        let mut num_edges: Vec<EdgeRef> = Vec::new();
        for start in 0..self.chars.len() {
            let char = self.chars[start];
            if let Some(new_edge) = Edge::new_numeric(start, start + 1, char, uroman) {
                let edge_ref = self.add_edge(new_edge);
                num_edges.push(edge_ref);
            }
        }

        // D1: sequences of digits, with an optional single decimal point.
        let mut i = 0;
        while i < num_edges.len() {
            let edge = num_edges[i].clone();
            if Self::edge_is_digit(&edge) && edge.borrow().is_active() {
                let mut n_decimal_points = 0;
                let mut n_decimals: Option<usize> = None;
                let mut new_value_s = (edge.borrow().value().unwrap() as i64).to_string();
                let mut sub_edges = vec![edge.clone()];
                let mut prev_edge = edge.clone();
                loop {
                    let right_edge = self.best_right_neighbor_edge(prev_edge.borrow().end(), false);
                    if let Some(re) = &right_edge
                        && Self::edge_is_digit(re)
                    {
                        sub_edges.push(re.clone());
                        new_value_s.push_str(&(re.borrow().value().unwrap() as i64).to_string());
                        if let Some(n) = n_decimals.as_mut() {
                            *n += 1;
                        }
                        prev_edge = re.clone();
                    } else {
                        let end = prev_edge.borrow().end();
                        if end < self.chars.len()
                            && self.chars[end] == '.'
                            && n_decimal_points == 0
                            && let Some(re2) = self.best_right_neighbor_edge(end + 1, false)
                            && Self::edge_is_digit(&re2)
                        {
                            let period_edge = match &right_edge {
                                Some(re) => re.clone(),
                                None => self.add_edge(Edge::new_regular(end, end + 1, self.chars[end].to_string(), "decimal period".to_string())),
                            };
                            sub_edges.push(period_edge);
                            sub_edges.push(re2.clone());
                            new_value_s.push('.');
                            new_value_s.push_str(&(re2.borrow().value().unwrap() as i64).to_string());
                            n_decimal_points += 1;
                            n_decimals = Some(1);
                            prev_edge = re2;
                        } else {
                            break;
                        }
                    }
                }
                if sub_edges.len() >= 2 {
                    let new_value: f64 = new_value_s.parse().unwrap_or(0.0);
                    let start = sub_edges[0].borrow().start();
                    let end = sub_edges.last().unwrap().borrow().end();
                    let script = sub_edges.last().unwrap().borrow().get_script();
                    let new_edge = Edge::new_combined_numeric(
                        start,
                        end,
                        new_value,
                        "D1".to_string(),
                        script,
                        Some(1),
                        n_decimals,
                        new_value_s,
                    );
                    let new_ref = self.add_edge(new_edge);
                    Self::deactivate(&sub_edges);
                    num_edges.push(new_ref);
                }
            }
            i += 1;
        }

        // G1: single-digit multiplier * base, e.g. 3*100 = 300.
        let mut i = 0;
        while i < num_edges.len() {
            let edge = num_edges[i].clone();
            let (active, num_base, value) = {
                let e = edge.borrow();
                (e.is_active(), e.get_num_base(), e.value())
            };
            if active
                && num_base == Some(1)
                && matches!(value, Some(v) if v.fract() == 0.0 && v >= 1.0)
            {
                if let Some(right_edge) = self.best_right_neighbor_edge(edge.borrow().end(), false) {
                    let (r_active, r_base, r_value, r_large) = {
                        let re = right_edge.borrow();
                        (re.is_active(), re.get_num_base(), re.value(), re.is_large_power())
                    };
                    if r_active
                        && matches!(r_value, Some(v) if v.fract() == 0.0)
                        && r_base.is_some_and(|b| b > 1)
                        && !r_large
                    {
                        let new_value = value.unwrap() * r_value.unwrap();
                        let start = edge.borrow().start();
                        let end = right_edge.borrow().end();
                        let orig = format!("{}{}", edge.borrow().orig_txt(), right_edge.borrow().orig_txt());
                        let script = right_edge.borrow().get_script();
                        let new_edge = Edge::new_combined_numeric(start, end, new_value, "G1".to_string(), script, r_base, None, orig);
                        let new_ref = self.add_edge(new_edge);
                        Self::deactivate(&[edge.clone(), right_edge]);
                        num_edges.push(new_ref);
                    }
                }
            }
            i += 1;
        }

        // G2: sum of blocks within a power, e.g. 200+30+4 = 234.
        let mut i = 0;
        while i < num_edges.len() {
            let edge = num_edges[i].clone();
            let (active, value, is_large) = {
                let e = edge.borrow();
                (e.is_active(), e.value(), e.is_large_power())
            };
            if active && matches!(value, Some(v) if v.fract() == 0.0) && !is_large {
                let mut sub_edges = vec![edge.clone()];
                let mut prev_edge = edge.clone();
                let mut prev_non_edge = edge.clone();
                loop {
                    let end = prev_edge.borrow().end();
                    let Some(right_edge) = self.best_right_neighbor_edge(end, false) else { break };
                    let (r_active, r_value, r_large) = {
                        let re = right_edge.borrow();
                        (re.is_active(), re.value(), re.is_large_power())
                    };
                    if !(r_active && matches!(r_value, Some(v) if v.fract() == 0.0) && !r_large) {
                        break;
                    }
                    let gap_null = Self::is_gap_null_edge(&prev_non_edge);
                    let (prev_base, r_base) = (prev_non_edge.borrow().get_num_base(), right_edge.borrow().get_num_base());
                    let ok = gap_null
                        || (prev_base.is_some_and(|b| Some(b as f64) > r_value) && prev_base > r_base);
                    if !ok {
                        break;
                    }
                    sub_edges.push(right_edge.clone());
                    prev_edge = right_edge.clone();
                    if !Self::is_gap_null_edge(&right_edge) {
                        prev_non_edge = right_edge.clone();
                    }
                }
                if sub_edges.len() >= 2 {
                    let new_value: f64 = sub_edges.iter().map(|e| e.borrow().value().unwrap_or(0.0)).sum();
                    let start = sub_edges[0].borrow().start();
                    let end = sub_edges.last().unwrap().borrow().end();
                    let num_base = sub_edges.last().unwrap().borrow().get_num_base();
                    let orig: String = sub_edges.iter().map(|e| e.borrow().orig_txt().to_string()).collect();
                    let script = sub_edges.last().unwrap().borrow().get_script();
                    let new_edge = Edge::new_combined_numeric(start, end, new_value, "G2".to_string(), script, num_base, None, orig);
                    let new_ref = self.add_edge(new_edge);
                    Self::deactivate(&sub_edges);
                    num_edges.push(new_ref);
                }
            }
            i += 1;
        }

        // G3: block * large power, e.g. 234*1000 = 234000.
        let mut i = 0;
        while i < num_edges.len() {
            let edge = num_edges[i].clone();
            let (active, value, is_large) = {
                let e = edge.borrow();
                (e.is_active(), e.value(), e.is_large_power())
            };
            if active && value.is_some() && !is_large {
                if let Some(right_edge) = self.best_right_neighbor_edge(edge.borrow().end(), false) {
                    let (r_active, r_base, r_value, r_large) = {
                        let re = right_edge.borrow();
                        (re.is_active(), re.get_num_base(), re.value(), re.is_large_power())
                    };
                    if r_active && matches!(r_value, Some(v) if v.fract() == 0.0) && r_base.is_some_and(|b| b > 1) && r_large {
                        let mut new_value = (value.unwrap() * r_value.unwrap() * 1e5).round() / 1e5;
                        if new_value.fract() == 0.0 {
                            new_value = new_value.trunc();
                        }
                        let start = edge.borrow().start();
                        let end = right_edge.borrow().end();
                        let orig = format!("{}{}", edge.borrow().orig_txt(), right_edge.borrow().orig_txt());
                        let script = right_edge.borrow().get_script();
                        let new_edge = Edge::new_combined_numeric(start, end, new_value, "G3".to_string(), script, r_base, None, orig);
                        let new_ref = self.add_edge(new_edge);
                        Self::deactivate(&[edge.clone(), right_edge]);
                        num_edges.push(new_ref);
                    }
                }
            }
            i += 1;
        }

        // G4: sum of G3 blocks, with CJK digit-tag reinterpretation, e.g. 234000+567.
        let mut i = 0;
        while i < num_edges.len() {
            let edge = num_edges[i].clone();
            let (active, value) = {
                let e = edge.borrow();
                (e.is_active(), e.value())
            };
            if active && matches!(value, Some(v) if v.fract() == 0.0) {
                let mut sub_edges = vec![edge.clone()];
                loop {
                    let prev_edge = sub_edges.last().unwrap().clone();
                    let end = prev_edge.borrow().end();
                    let Some(right_edge) = self.best_right_neighbor_edge(end, false) else { break };
                    let (r_active, r_value) = {
                        let re = right_edge.borrow();
                        (re.is_active(), re.value())
                    };
                    if !(r_active && matches!(r_value, Some(v) if v.fract() == 0.0)) {
                        break;
                    }
                    let (prev_base, prev_script, prev_type) = {
                        let pe = prev_edge.borrow();
                        (pe.get_num_base(), pe.get_script(), pe.r#type().to_string())
                    };
                    let ok = prev_base.is_some_and(|b| Some(b as f64) > r_value)
                        && prev_base.is_some_and(|b| Some(b) > right_edge.borrow().get_num_base());
                    if !ok {
                        break;
                    }
                    if prev_script.as_deref() == Some("CJK")
                        && prev_base.is_some_and(|b| b >= 1000)
                        && !prev_type.contains("tag")
                        && prev_base.is_some_and(|b| b % 10 == 0)
                        && matches!(r_value, Some(v) if (1.0..=9.0).contains(&v))
                        && right_edge.borrow().end() - right_edge.borrow().start() == 1
                    {
                        let new_num_base = prev_base.unwrap() / 10;
                        let new_value = new_num_base as f64 * r_value.unwrap();
                        right_edge.borrow_mut().update(NumDataUpdates {
                            value: Some(new_value),
                            num_base: Some(new_num_base),
                            r#type: Some("G4tag".to_string()),
                            ..Default::default()
                        });
                    }
                    sub_edges.push(right_edge);
                }
                if sub_edges.len() >= 2 {
                    let new_value: f64 = sub_edges.iter().map(|e| e.borrow().value().unwrap_or(0.0)).sum();
                    let start = sub_edges[0].borrow().start();
                    let end = sub_edges.last().unwrap().borrow().end();
                    let num_base = sub_edges.last().unwrap().borrow().get_num_base();
                    let orig: String = sub_edges.iter().map(|e| e.borrow().orig_txt().to_string()).collect();
                    let script = sub_edges.last().unwrap().borrow().get_script();
                    let new_edge = Edge::new_combined_numeric(start, end, new_value, "G4".to_string(), script, num_base, None, orig);
                    let new_ref = self.add_edge(new_edge);
                    Self::deactivate(&sub_edges);
                    num_edges.push(new_ref);
                }
            }
            i += 1;
        }

        // G5: fractions and percentages via a fraction-connector character.
        for edge in num_edges.clone() {
            let (value, end, orig) = {
                let e = edge.borrow();
                (e.value(), e.end(), e.orig_txt().to_string())
            };
            let Some(value) = value else { continue };
            if value.fract() != 0.0 {
                continue;
            }
            for fraction_connector in &uroman.fraction_connectors_iter() {
                let fc_end = end + fraction_connector.chars().count();
                if self.substr(end, fc_end) != *fraction_connector {
                    continue;
                }
                let Some(right_edge) = self.best_right_neighbor_edge(fc_end, false) else { continue };
                let Some(r_value) = right_edge.borrow().value() else { continue };
                let start = edge.borrow().start();
                let r_end = right_edge.borrow().end();
                if value == 100.0 {
                    let new_edge = Edge::new_regular(start, r_end, format!("{}%", fmt_num(r_value)), "percentage".to_string());
                    let new_ref = self.add_edge(new_edge);
                    Self::deactivate(&[edge.clone(), right_edge]);
                    num_edges.push(new_ref);
                } else if r_value.fract() == 0.0 && value > 0.0 {
                    let mut new_edge = Edge::new_combined_numeric(
                        start,
                        r_end,
                        r_value,
                        "fraction".to_string(),
                        None,
                        None,
                        None,
                        orig.clone(),
                    );
                    new_edge.update(NumDataUpdates {
                        fraction: Some(num_rational::Ratio::new(r_value as i64, value as i64)),
                        ..Default::default()
                    });
                    let new_ref = self.add_edge(new_edge);
                    Self::deactivate(&[edge.clone(), right_edge]);
                    num_edges.push(new_ref);
                }
            }
        }

        // G6: plus/minus sign prefixes.
        for edge in num_edges.clone() {
            let (start, end, txt, e_type) = {
                let e = edge.borrow();
                (e.start(), e.end(), e.txt().to_string(), e.r#type().to_string())
            };
            for minus_sign in &uroman.minus_signs_iter() {
                let len = minus_sign.chars().count();
                if start >= len && self.substr(start - len, start) == *minus_sign {
                    self.add_edge(Edge::new_regular(start - len, end, format!("-{txt}"), format!("{e_type} -")));
                }
            }
            for plus_sign in &uroman.plus_signs_iter() {
                let len = plus_sign.chars().count();
                if start >= len && self.substr(start - len, start) == *plus_sign {
                    self.add_edge(Edge::new_regular(start - len, end, format!("+{txt}"), format!("{e_type} +")));
                }
            }
        }

        // F1: cushion adjacent digit runs, e.g. 23½ -> 23 1/2.
        for edge in &num_edges {
            let (start, txt, has_fraction) = {
                let e = edge.borrow();
                (e.start(), e.txt().to_string(), matches!(e, Edge::Numeric { num_data, .. } if num_data.fraction.is_some()))
            };
            if txt.starts_with(|c: char| c.is_ascii_digit())
                && let Some(left_edge) = self.best_left_neighbor_edge(start, false)
                && left_edge.borrow().txt().ends_with(|c: char| c.is_ascii_digit())
            {
                let sep = if has_fraction { " " } else { "\u{00B7}" };
                let new_txt = format!("{sep}{txt}");
                if let Edge::Numeric { data, .. } = &mut *edge.borrow_mut() {
                    data.txt = new_txt;
                }
            }
        }

        // Exceptions: characters that read as numbers but shouldn't romanize as digits.
        for edge in &num_edges {
            let mut e = edge.borrow_mut();
            if !e.is_active() {
                continue;
            }
            let Some(value) = e.value() else { continue };
            let single_char = e.end() - e.start() == 1;
            let orig = e.orig_txt().to_string();
            if (value > 1000.0 && single_char)
                || "\u{5169}\u{53C3}\u{53C3}\u{4F0D}\u{9678}\u{516D}\u{4EDF}\u{4EC0}".contains(orig.as_str())
                || orig == "\u{4EAC}\u{5146}"
            {
                e.set_active(false);
            }
        }

        for start in 0..self.chars.len() {
            if let Some(best) = self.best_edge_in_span(start, start + 1, false)
                && best.borrow().is_numeric()
            {
                continue;
            }
            let c = self.chars[start];
            if let Some(num) = self.uroman.get_numeric_value(c)
                && num.fract() == 0.0
                && (0.0..=9.0).contains(&num)
                && self.uroman.chr_name(c).contains("DIGIT")
            {
                self.add_edge(Edge::new_regular(start, start + 1, (num as i64).to_string(), "num".to_string()));
            }
        }
    }

    fn deactivate(edges: &[EdgeRef]) {
        for e in edges {
            e.borrow_mut().set_active(false);
        }
    }

    pub fn add_rom_fall_back_singles(&self) {
        for start in 0..self.max_vertex {
            let end = start + 1;
            if !self.edges_in_span(start, end).is_empty() {
                continue;
            }
            let orig_char = self.chars[start];
            let (mut rom, mut annotation) = (orig_char.to_string(), "orig".to_string());
            if self.uroman.char_is_nonspacing_mark(orig_char) {
                rom = String::new();
                annotation = "Mn".to_string();
            } else if self.uroman.char_is_format_char(orig_char) {
                rom = String::new();
                annotation = "Cf".to_string();
            } else if self.uroman.char_is_private_use(orig_char) {
                rom = String::new();
                annotation = "Co".to_string();
            } else if orig_char == ' ' {
                annotation = "orig".to_string();
            } else if let Some(rom2) = self.simple_top_romanization_candidate_for_span(start, end, false) {
                rom = if let Some(m) = PLUS_PREFIX_RE.find(&rom2) {
                    let _ = m;
                    rom2[1..].to_string()
                } else {
                    rom2
                };
                annotation = "rom single".to_string();
            }
            self.add_edge(Edge::new_regular(start, end, rom, annotation));
        }
    }

    fn add_new_edge_if_absent(
        old_edges: &mut Vec<Edge>,
        seen: &mut HashSet<(usize, usize, String)>,
        start: usize,
        end: usize,
        new_rom: String,
        new_type: String,
        position: Option<usize>,
    ) {
        let key = (start, end, new_rom.clone());
        if seen.contains(&key) {
            return;
        }
        let new_edge = Edge::new_regular(start, end, new_rom, new_type);
        match position {
            Some(p) => old_edges.insert(p + 1, new_edge),
            None => old_edges.push(new_edge),
        }
        seen.insert(key);
    }

    pub fn add_alternatives(&self, old_edges: &mut Vec<Edge>) {
        let mut seen: HashSet<(usize, usize, String)> = old_edges
            .iter()
            .map(|e| (e.start(), e.end(), e.txt().to_string()))
            .collect();
        let snapshot: Vec<(usize, Edge)> = old_edges.iter().cloned().enumerate().collect();
        for (position, old_edge) in snapshot {
            if old_edge.r#type().starts_with("rom-alt") {
                continue;
            }
            let (start, end) = (old_edge.start(), old_edge.end());
            let orig_s = self.substr(start, end);
            let old_rom = old_edge.txt().to_string();
            let (old_rom_core, old_rom_suffix) = match CORE_SUFFIX_RE.captures(old_edge.r#type()) {
                Some(cap) => (
                    Some(cap.get(1).unwrap().as_str().to_string()),
                    Some(cap.get(2).unwrap().as_str().to_string()),
                ),
                None => (None, None),
            };
            let Some(rules) = self.uroman.rom_rules.get(&orig_s) else { continue };
            for rule in rules {
                let Some(rom_t) = &rule.t else { continue };
                if !self.cand_is_valid(rule, start, end) {
                    continue;
                }
                if (Some(rom_t) == Some(&old_rom) || Some(rom_t) == old_rom_core.as_ref()) && !rule.t_alts.is_empty() {
                    for rom_alt in &rule.t_alts {
                        let mut rom_alt = rom_alt.clone();
                        if old_rom_suffix.is_some() && Some(rom_t) == old_rom_core.as_ref() {
                            rom_alt.push_str(old_rom_suffix.as_deref().unwrap());
                        }
                        Self::add_new_edge_if_absent(
                            old_edges,
                            &mut seen,
                            start,
                            end,
                            rom_alt,
                            "rom-alt".to_string(),
                            Some(position),
                        );
                    }
                }
                if let Some(eos) = &rule.t_at_end_of_syllable {
                    if rom_t == &old_rom {
                        Self::add_new_edge_if_absent(
                            old_edges,
                            &mut seen,
                            start,
                            end,
                            rom_t.clone(),
                            "rom-alt2".to_string(),
                            Some(position),
                        );
                    }
                    if eos == &old_rom {
                        Self::add_new_edge_if_absent(
                            old_edges,
                            &mut seen,
                            start,
                            end,
                            rom_t.clone(),
                            "rom-alt3".to_string(),
                            Some(position),
                        );
                    }
                }
            }
        }
    }

    pub fn all_edges(&self, start: usize, end: usize) -> Vec<Edge> {
        let mut result = Vec::new();
        for start2 in start..end {
            for end2 in self.ends_from(start2) {
                if end2 <= end {
                    for e in self.edges_in_span(start2, end2) {
                        result.push(e.borrow().clone());
                    }
                } else {
                    break;
                }
            }
        }
        result
    }

    fn best_edge_in_span(&self, start: usize, end: usize, skip_num_edge: bool) -> Option<EdgeRef> {
        let edges = self.edges_in_span(start, end);
        let mut decomp_edge = None;
        let mut rom_edge = None;
        let mut other_edge = None;
        for edge in edges {
            let is_numeric = edge.borrow().is_numeric();
            if is_numeric {
                if skip_num_edge {
                    continue;
                }
                if edge.borrow().is_active() {
                    return Some(edge);
                }
            }
            let e_type = edge.borrow().r#type().to_string();
            if e_type.starts_with("rom decomp") {
                decomp_edge.get_or_insert(edge);
            } else if e_type.starts_with("rom") || e_type.starts_with("num") {
                rom_edge.get_or_insert(edge);
            } else {
                other_edge.get_or_insert(edge);
            }
        }
        rom_edge.or(decomp_edge).or(other_edge)
    }

    fn best_right_neighbor_edge(&self, start: usize, skip_num_edge: bool) -> Option<EdgeRef> {
        for end in self.ends_from(start) {
            if let Some(edge) = self.best_edge_in_span(start, end, skip_num_edge) {
                return Some(edge);
            }
        }
        None
    }

    fn best_left_neighbor_edge(&self, end: usize, skip_num_edge: bool) -> Option<EdgeRef> {
        for start in self.starts_to(end) {
            if let Some(edge) = self.best_edge_in_span(start, end, skip_num_edge) {
                return Some(edge);
            }
        }
        None
    }

    pub fn best_rom_edge_path(&self, start: usize, end: usize, skip_num_edge: bool) -> Vec<Edge> {
        let mut result = Vec::new();
        let mut pos = start;
        while pos < end {
            if let Some(best_edge) = self.best_right_neighbor_edge(pos, skip_num_edge) {
                pos = best_edge.borrow().end();
                result.push(best_edge.borrow().clone());
            } else {
                pos += 1;
            }
        }
        result
    }

    fn find_rom_edge_path_backwards_str(&self, start: usize, end: usize, min_char: Option<usize>) -> String {
        let mut rom = String::new();
        let mut end2 = end;
        while start < end2 {
            let old_end2 = end2;
            if let Some(new_edge) = self.best_left_neighbor_edge(end2, false) {
                rom = format!("{}{}", new_edge.borrow().txt(), rom);
                end2 = new_edge.borrow().start();
            }
            if let Some(min_char) = min_char
                && rom.chars().count() >= min_char
            {
                break;
            }
            if old_end2 >= end2 {
                if end2 == 0 {
                    break;
                }
                end2 -= 1;
            }
        }
        rom
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn strip_tibetan_trailing_a(rom: &str) -> String {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([bcdfghjklmnpqrstvwxyz].*)a$").unwrap());
    match RE.captures(rom) {
        Some(cap) => cap.get(1).unwrap().as_str().to_string(),
        None => rom.to_string(),
    }
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        (v as i64).to_string()
    } else {
        v.to_string()
    }
}
