#![no_main]

use libfuzzer_sys::fuzz_target;
use rte_core::normalize_title;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let once = normalize_title(Some(&raw));
    assert_eq!(normalize_title(Some(&once)), once);
});
