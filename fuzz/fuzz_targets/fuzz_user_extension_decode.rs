//! Fuzz target for vendor extension decoding on SCIM users.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_user_extension_decode -- -max_total_time=600

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scimsync_scim_client::mapper::to_downstream_user;
use scimsync_scim_client::models::{
    ScimUser, UserExtension, BEYOND_IDENTITY_USER_EXTENSION, BYNDID_USER_EXTENSION,
};

#[derive(Arbitrary, Debug)]
struct ExtensionInput {
    legacy_schema: bool,
    active: bool,
    /// Raw JSON used as the extension object.
    payload: String,
}

fuzz_target!(|input: ExtensionInput| {
    if input.payload.len() > 4096 {
        return;
    }
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(&input.payload) else {
        return;
    };
    let schema = if input.legacy_schema {
        BYNDID_USER_EXTENSION
    } else {
        BEYOND_IDENTITY_USER_EXTENSION
    };

    // Decoding never fails; shapes it cannot read become Unrecognized.
    let decoded = UserExtension::decode(schema, &payload);
    if !payload.is_object() {
        assert!(matches!(decoded, UserExtension::Unrecognized { .. }));
    }

    let user: ScimUser = match serde_json::from_value(serde_json::json!({
        "id": "u-1",
        "userName": "fuzz@co",
        "active": input.active,
        schema: payload,
    })) {
        Ok(user) => user,
        Err(_) => return,
    };

    if let Ok(mapped) = to_downstream_user(user) {
        // Inactive users are never reported as enrolled.
        if !input.active {
            assert!(!mapped.enrolled);
        }
    }
});
