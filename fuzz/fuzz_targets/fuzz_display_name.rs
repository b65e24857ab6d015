//! Fuzz target for display-name derivation.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_display_name -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use scimsync_reconcile::naming::{display_name_from_address, is_word_separator};

fuzz_target!(|address: &str| {
    let name = display_name_from_address(address);

    // Never empty for a non-empty address.
    if !address.is_empty() {
        assert!(!name.is_empty());
    }

    let local = address.split_once('@').map_or(address, |(local, _)| local);
    if local.split(is_word_separator).all(str::is_empty) {
        assert_eq!(name, address);
    } else {
        // Separators collapse to single spaces between words.
        assert!(!name.contains(['.', '_', '-', '@']));
        assert!(!name.contains("  "));
        assert!(!name.starts_with(' ') && !name.ends_with(' '));
    }
});
