extern crate uroman;

use uroman::{RomFormat, Uroman};

fn main() {
    let uroman = Uroman::new();

    let s = "こんにちは、ユーロマン！";
    let lcode = None;

    // Str output (the default when `rom_format` is `None`).
    let result = uroman
        .romanize_string(s, lcode, None)
        .and_then(|r| r.to_output_string())
        .unwrap();

    println!("{result}");

    // Lattice output: every edge in the lattice, with alternatives.
    let result = uroman
        .romanize_string(s, lcode, Some(&RomFormat::Lattice))
        .and_then(|r| r.to_output_string())
        .unwrap();

    println!("{result}");
}
