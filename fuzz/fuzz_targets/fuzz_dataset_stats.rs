#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if let Ok(stats) = erx::bench::DatasetStats::from_reader(Cursor::new(data)) {
        assert!(stats.total_length <= data.len() as u64);
        assert!(stats.sequences <= data.len() as u64);
    }
});
