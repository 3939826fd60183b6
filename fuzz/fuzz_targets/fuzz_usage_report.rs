#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary report text must parse or fail cleanly
    let _ = erx::bench::usage::parse_report(data);
});
