//! Admin SDK Directory API resources (the subset used here).

use serde::{Deserialize, Serialize};

use scimsync_reconcile::{MemberKind, MemberStatus, UpstreamGroup, UpstreamMember};

/// `admin#directory#group`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Group {
    #[must_use]
    pub fn into_upstream(self) -> UpstreamGroup {
        UpstreamGroup {
            address: self.email,
            display_name: self.name,
            description: self.description,
        }
    }
}

/// `admin#directory#member`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub member_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Member {
    /// Request body for inserting a plain member.
    #[must_use]
    pub fn new_user(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            role: Some("MEMBER".to_string()),
            member_type: Some("USER".to_string()),
            status: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self.member_type.as_deref() {
            Some("USER") => MemberKind::Person,
            Some("GROUP") => MemberKind::Group,
            _ => MemberKind::Other,
        }
    }

    #[must_use]
    pub fn member_status(&self) -> MemberStatus {
        match self.status.as_deref() {
            Some("ACTIVE") => MemberStatus::Active,
            Some("SUSPENDED") => MemberStatus::Suspended,
            _ => MemberStatus::Other,
        }
    }

    #[must_use]
    pub fn into_upstream(self) -> UpstreamMember {
        let kind = self.kind();
        let status = self.member_status();
        UpstreamMember::new(self.email, kind, status)
    }
}

/// One page of `members.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPage {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_mapping() {
        let member: Member = serde_json::from_value(json!({
            "kind": "admin#directory#member",
            "id": "1234",
            "email": "alice@co",
            "role": "MEMBER",
            "type": "USER",
            "status": "ACTIVE"
        }))
        .unwrap();

        let upstream = member.into_upstream();
        assert_eq!(upstream.address, "alice@co");
        assert_eq!(upstream.kind, MemberKind::Person);
        assert_eq!(upstream.status, MemberStatus::Active);
        assert!(upstream.is_eligible());
    }

    #[test]
    fn test_unknown_type_and_status() {
        let nested: Member =
            serde_json::from_value(json!({ "email": "team@co", "type": "GROUP" })).unwrap();
        assert_eq!(nested.kind(), MemberKind::Group);
        assert_eq!(nested.member_status(), MemberStatus::Other);

        let customer: Member =
            serde_json::from_value(json!({ "id": "C01", "type": "CUSTOMER", "status": "SUSPENDED" }))
                .unwrap();
        assert_eq!(customer.kind(), MemberKind::Other);
        assert_eq!(customer.member_status(), MemberStatus::Suspended);
        assert!(customer.email.is_empty());
    }

    #[test]
    fn test_new_user_body() {
        let body = serde_json::to_value(Member::new_user("bob@co")).unwrap();
        assert_eq!(body, json!({ "email": "bob@co", "role": "MEMBER", "type": "USER" }));
    }

    #[test]
    fn test_group_into_upstream() {
        let group: Group = serde_json::from_value(json!({
            "id": "g1",
            "email": "eng@co",
            "name": "Engineering"
        }))
        .unwrap();
        let upstream = group.into_upstream();
        assert_eq!(upstream.display_name, "Engineering");
        assert_eq!(upstream.description, "");
    }
}
