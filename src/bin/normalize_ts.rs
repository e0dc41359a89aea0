// src/bin/normalize_ts.rs
//
// Print how each argument would pre-fill the sighting edit form.
//
//   cargo run --bin normalize_ts -- "21 December 2025, 14:00" "21/12/25 9:30" "soon"

use sightings_feed::timestamp;

fn main() {
    sightings_feed::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: normalize_ts <timestamp>...");
        std::process::exit(2);
    }

    for raw in &args {
        match timestamp::normalize(Some(raw.as_str())) {
            Some(canonical) => println!("{raw:?} -> {canonical}"),
            None => println!("{raw:?} -> (empty)"),
        }
    }
}
