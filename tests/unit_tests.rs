//! End-to-end romanization tests driven through the public `Uroman` API, plus
//! a couple of representative cases exercised through the CLI binary.

use assert_cmd::Command;
use predicates::prelude::*;
use uroman::{RomFormat, RomanizationResult, Uroman};

fn romanize(u: &Uroman, s: &str, lcode: Option<&str>) -> String {
    match u.romanize_string(s, lcode, None).unwrap() {
        RomanizationResult::Str(s) => s,
        RomanizationResult::Edges(_) => unreachable!(),
    }
}

fn romanize_edges(u: &Uroman, s: &str, lcode: Option<&str>) -> Vec<String> {
    match u
        .romanize_string(s, lcode, Some(&RomFormat::Edges))
        .unwrap()
    {
        RomanizationResult::Edges(edges) => {
            edges.iter().map(|e| e.txt().to_string()).collect()
        }
        RomanizationResult::Str(_) => unreachable!(),
    }
}

#[test]
fn cyrillic_ukrainian_soft_sign_and_h(){
    let u = Uroman::new();
    assert_eq!(romanize(&u, "Игорь", Some("ukr")), "Ihor");
}

#[test]
fn cyrillic_ukrainian_edges_concatenate_to_ihor() {
    let u = Uroman::new();
    let edges = romanize_edges(&u, "Игорь", Some("ukr"));
    assert_eq!(edges.concat(), "Ihor");
}

#[test]
fn japanese_sokuon_and_youon_sentence() {
    let u = Uroman::new();
    assert_eq!(
        romanize(&u, "ちょっとまってください", None),
        "chottomattekudasai"
    );
}

#[test]
fn japanese_small_y_algorithmic_merge_without_direct_rule() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "きゃ", None), "kya");
}

#[test]
fn devanagari_sentence_inherent_vowel_and_conjuncts() {
    let u = Uroman::new();
    assert_eq!(
        romanize(&u, "यह एक अच्छा अनुवाद है.", Some("hin")),
        "yah ek achchha anuvad hai."
    );
}

#[test]
fn arabic_has_no_abugida_vowel_insertion() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "ألاسكا", None), "alaska");
}

#[test]
fn han_fraction_via_connector_aggregation() {
    let u = Uroman::new();
    let rom = romanize(&u, "三分之二", None);
    assert!(rom.contains("2/3"), "expected a 2/3 fraction in {rom:?}");
}

#[test]
fn han_percentage_via_connector_aggregation() {
    let u = Uroman::new();
    let rom = romanize(&u, "百分之二十", None);
    assert!(rom.contains("20%"), "expected a 20% in {rom:?}");
}

#[test]
fn braille_number_block() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "⠼⠁⠃⠉", None), "123");
}

#[test]
fn vulgar_fraction_decomposition() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "½", None), "1/2");
}

#[test]
fn digit_run_cushioned_by_vulgar_fraction() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "23½", None), "23 1/2");
}

#[test]
fn ascii_round_trips_unchanged() {
    let u = Uroman::new();
    let text = "The quick brown fox jumps over the lazy dog, 2024!";
    assert_eq!(romanize(&u, text, None), text);
}

#[test]
fn han_multiplier_and_sum_aggregation() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "三百三十四", None), "334");
}

#[test]
fn han_gap_null_and_large_power_aggregation() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "二千零三", None), "2003");
}

#[test]
fn devanagari_digit_with_minus_sign() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "−५", None), "-5");
}

#[test]
fn thai_written_before_spoken_after_vowel_reordering() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "เกา", Some("tha")), "kao");
}

#[test]
fn hangul_syllable_decomposition() {
    let u = Uroman::new();
    assert_eq!(romanize(&u, "한국어", Some("kor")), "hangugeo");
}

#[test]
fn romanization_is_idempotent_on_already_latin_text() {
    let u = Uroman::new();
    let once = romanize(&u, "Hello, world!", None);
    let twice = romanize(&u, &once, None);
    assert_eq!(once, twice);
}

#[test]
fn cli_direct_input_with_language_hint() {
    Command::cargo_bin("uroman-rs")
        .unwrap()
        .args(["-l", "ukr", "Игорь"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ihor"));
}

#[test]
fn cli_edges_format_reports_offsets() {
    // spec.md's EDGES format is a JSON array of 4-tuples [start, end, text, type].
    Command::cargo_bin("uroman-rs")
        .unwrap()
        .args(["-f", "edges", "½"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2"))
        .stdout(predicate::str::contains("\"rom decomp\""));
}

#[test]
fn edges_format_serializes_as_four_tuples() {
    let u = Uroman::new();
    match u
        .romanize_string("Игорь", Some("ukr"), Some(&RomFormat::Edges))
        .unwrap()
    {
        RomanizationResult::Edges(edges) => {
            let json = serde_json::to_string(&edges).unwrap();
            assert!(json.starts_with("[["), "expected array of tuples, got {json}");
            let (mut covered_start, text) = (0usize, edges.iter().map(|e| e.txt().to_string()).collect::<String>());
            for e in &edges {
                assert_eq!(e.start(), covered_start, "edges must tile [0, len) without gaps");
                covered_start = e.end();
            }
            assert_eq!(text, "Ihor");
        }
        RomanizationResult::Str(_) => unreachable!(),
    }
}
