//! Conversions between SCIM resources and reconciliation types.

use scimsync_reconcile::{DownstreamGroup, DownstreamUser, NewDownstreamUser};

use crate::error::{ScimClientError, ScimClientResult};
use crate::models::{ScimEmail, ScimGroup, ScimUser};

/// Build the SCIM resource for a user about to be provisioned.
///
/// The upstream address becomes `externalId`, `userName` and the primary
/// work email.
#[must_use]
pub fn new_user_resource(user: &NewDownstreamUser) -> ScimUser {
    let mut resource = ScimUser::new(&user.address);
    resource.external_id = Some(user.external_id.clone());
    resource.display_name = Some(user.display_name.clone());
    resource.emails = vec![ScimEmail {
        value: user.address.clone(),
        email_type: Some("work".to_string()),
        primary: true,
    }];
    resource
}

/// Map a SCIM user to the reconciler's view.
pub fn to_downstream_user(user: ScimUser) -> ScimClientResult<DownstreamUser> {
    let enrolled = user.active && user.passkey_hint().unwrap_or(false);
    let work_email = user.primary_email().map(str::to_string);
    let id = user.id.ok_or_else(|| {
        ScimClientError::ParseError(format!("user {} has no id", user.user_name))
    })?;
    Ok(DownstreamUser {
        id,
        external_id: user.external_id,
        user_name: user.user_name,
        display_name: user.display_name,
        work_email,
        active: user.active,
        enrolled,
    })
}

/// Map a SCIM group to the reconciler's view.
pub fn to_downstream_group(group: ScimGroup) -> ScimClientResult<DownstreamGroup> {
    let id = group.id.ok_or_else(|| {
        ScimClientError::ParseError(format!("group {} has no id", group.display_name))
    })?;
    Ok(DownstreamGroup {
        id,
        display_name: group.display_name,
    })
}
