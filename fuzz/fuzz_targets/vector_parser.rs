#![no_main]

use fittrace::vector::Vector3;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Any accepted vector must have finite components
        if let Ok(v) = Vector3::parse(input) {
            assert!(v.x.is_finite() && v.y.is_finite() && v.z.is_finite());
        }
    }
});
