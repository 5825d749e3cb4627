#![no_main]

use fittrace::trial::TrialRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(trial) = TrialRecord::parse(content) {
            // Accepted trials are normalized and non-empty
            assert_eq!(trial.samples()[0].time, 0.0);
            assert!(trial.duration() >= 0.0);
        }
    }
});
