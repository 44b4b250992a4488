#![no_main]

use libfuzzer_sys::fuzz_target;
use rte_routing::{extract_account_route, extract_ticket_route, SecretOverrides};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let overrides = SecretOverrides::default();
    if let Some(route) = extract_account_route(Some(&raw), &overrides) {
        assert!(!route.repo.is_empty());
        assert!(!route.mailbox.contains('+'));
    }
    if let Some(route) = extract_ticket_route(Some(&raw), &overrides) {
        assert!(!route.repo.is_empty());
        assert_eq!(route.secret, route.mailbox);
    }
});
