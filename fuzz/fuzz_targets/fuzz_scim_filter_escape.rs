//! Fuzz target for SCIM filter literal escaping.
//!
//! An escaped value embedded in `userName eq "..."` must never terminate
//! the string literal early.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_scim_filter_escape -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use scimsync_scim_client::client::escape_scim_filter_value;

/// Undo the escaping, failing on a bare quote or dangling backslash.
fn unescape(escaped: &str) -> Option<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next @ ('\\' | '"')) => out.push(next),
                _ => return None,
            },
            '"' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

fuzz_target!(|value: &str| {
    let escaped = escape_scim_filter_value(value);
    assert_eq!(unescape(&escaped).as_deref(), Some(value));
});
