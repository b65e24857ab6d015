//! SCIM 2.0 resources as exchanged with the downstream directory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// Vendor user extension, current schema name.
pub const BEYOND_IDENTITY_USER_EXTENSION: &str =
    "urn:ietf:params:scim:schemas:extension:beyondidentity:2.0:User";
/// Vendor user extension, legacy schema name.
pub const BYNDID_USER_EXTENSION: &str = "urn:ietf:params:scim:schemas:extension:byndid:2.0:User";

/// SCIM Email value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimEmail {
    pub value: String,

    /// Email type (e.g., "work").
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,

    #[serde(default)]
    pub primary: bool,
}

/// SCIM User resource (RFC 7643 Section 4.1) plus vendor passkey fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(default)]
    pub user_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ScimEmail>,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_active_passkey: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_passkey: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub passkey_active: Option<bool>,

    /// Anything else, including extension schema objects keyed by URN.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

/// Passkey flags carried inside a vendor extension object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyExtension {
    #[serde(default)]
    pub has_active_passkey: Option<bool>,
    #[serde(default)]
    pub has_passkey: Option<bool>,
    #[serde(default)]
    pub passkey_active: Option<bool>,
}

impl PasskeyExtension {
    /// The most specific flag present.
    #[must_use]
    pub fn passkey(&self) -> Option<bool> {
        self.has_active_passkey
            .or(self.passkey_active)
            .or(self.has_passkey)
    }
}

/// A user extension payload, by schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserExtension {
    BeyondIdentity(PasskeyExtension),
    Byndid(PasskeyExtension),
    /// An extension we do not understand, or a known one with a shape we
    /// could not decode.
    Unrecognized { schema: String },
}

impl UserExtension {
    /// Decode one extension object; never fails.
    #[must_use]
    pub fn decode(schema: &str, value: &Value) -> Self {
        let known: Option<fn(PasskeyExtension) -> Self> = match schema {
            BEYOND_IDENTITY_USER_EXTENSION => Some(Self::BeyondIdentity),
            BYNDID_USER_EXTENSION => Some(Self::Byndid),
            _ => None,
        };
        match known {
            Some(variant) => match PasskeyExtension::deserialize(value) {
                Ok(ext) => variant(ext),
                Err(_) => Self::Unrecognized {
                    schema: schema.to_string(),
                },
            },
            None => Self::Unrecognized {
                schema: schema.to_string(),
            },
        }
    }

    /// Passkey flag reported by this extension, if any.
    #[must_use]
    pub fn passkey(&self) -> Option<bool> {
        match self {
            Self::BeyondIdentity(ext) | Self::Byndid(ext) => ext.passkey(),
            Self::Unrecognized { .. } => None,
        }
    }
}

impl ScimUser {
    /// Build a new active user resource.
    #[must_use]
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            schemas: vec![USER_SCHEMA.to_string()],
            id: None,
            external_id: None,
            user_name: user_name.into(),
            display_name: None,
            emails: Vec::new(),
            active: true,
            has_active_passkey: None,
            has_passkey: None,
            passkey_active: None,
            extra: Map::new(),
        }
    }

    /// Extension objects present on the resource, keyed by `urn:` names.
    #[must_use]
    pub fn extensions(&self) -> Vec<UserExtension> {
        self.extra
            .iter()
            .filter(|(key, _)| key.starts_with("urn:"))
            .map(|(key, value)| UserExtension::decode(key, value))
            .collect()
    }

    /// Passkey state as reported on the user record, top-level flags first.
    #[must_use]
    pub fn passkey_hint(&self) -> Option<bool> {
        self.has_active_passkey
            .or(self.passkey_active)
            .or(self.has_passkey)
            .or_else(|| self.extensions().iter().find_map(UserExtension::passkey))
    }

    /// Primary email, else the first one.
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary)
            .or_else(|| self.emails.first())
            .map(|e| e.value.as_str())
    }
}

/// SCIM Group member reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroupMember {
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// SCIM Group resource (RFC 7643 Section 4.2).
///
/// Upstream descriptions are not carried: the downstream schema has no
/// field for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ScimGroupMember>,
}

impl ScimGroup {
    /// Build a new empty group resource.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            schemas: vec![GROUP_SCHEMA.to_string()],
            id: None,
            display_name: display_name.into(),
            members: Vec::new(),
        }
    }
}

/// SCIM list response (RFC 7644 Section 3.4.2).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    #[serde(default)]
    pub total_results: i64,

    #[serde(rename = "Resources", default = "Vec::new")]
    pub resources: Vec<T>,
}

/// One PATCH operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScimPatchOp {
    pub op: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// PATCH request body (RFC 7644 Section 3.5.2).
#[derive(Debug, Clone, Serialize)]
pub struct ScimPatchRequest {
    pub schemas: Vec<String>,

    #[serde(rename = "Operations")]
    pub operations: Vec<ScimPatchOp>,
}

/// SCIM error body (RFC 7644 Section 3.12).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorBody {
    #[serde(default)]
    pub detail: Option<String>,

    #[serde(default)]
    pub scim_type: Option<String>,
}
