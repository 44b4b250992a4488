#![no_main]

use libfuzzer_sys::fuzz_target;
use chrono::NaiveDate;
use rte_core::HistoryCodec;

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);
    let codec = HistoryCodec::default();
    let decoded = codec.decode(&body);

    let Some(today) = NaiveDate::from_ymd_opt(2026, 3, 10) else {
        return;
    };
    let encoded = codec.encode("visible", &decoded.history, today);
    let reread = codec.decode(&encoded);
    assert_eq!(reread.history, decoded.history);
    assert_eq!(reread.visible_body, "visible");
});
