use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MemberError, MemberId};

/// Account standing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Suspended,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Suspended => "suspended",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MemberStatus::Active)
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MemberStatus::Active),
            "suspended" => Ok(MemberStatus::Suspended),
            _ => Err(format!("Invalid member status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields staff fill in when registering or editing a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<MemberStatus>,
}

impl MemberDetails {
    fn validate(&self) -> Result<(), MemberError> {
        if self.name.trim().is_empty() {
            return Err(MemberError::MissingField("name"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(MemberError::MissingField("email"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(MemberError::InvalidEmail),
        }
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn register_member(details: MemberDetails, now: DateTime<Utc>) -> Result<Member, MemberError> {
    details.validate()?;
    Ok(Member {
        member_id: MemberId::new(),
        name: details.name.trim().to_string(),
        email: details.email.trim().to_lowercase(),
        phone: optional_text(details.phone),
        address: optional_text(details.address),
        status: details.status.unwrap_or(MemberStatus::Active),
        created_at: now,
        updated_at: now,
    })
}

pub fn edit_member(
    member: &Member,
    details: MemberDetails,
    now: DateTime<Utc>,
) -> Result<Member, MemberError> {
    details.validate()?;
    Ok(Member {
        name: details.name.trim().to_string(),
        email: details.email.trim().to_lowercase(),
        phone: optional_text(details.phone),
        address: optional_text(details.address),
        status: details.status.unwrap_or(member.status),
        updated_at: now,
        ..member.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> MemberDetails {
        MemberDetails {
            name: "Siti Rahma".to_string(),
            email: " Siti@Example.com ".to_string(),
            phone: Some("".to_string()),
            address: None,
            status: None,
        }
    }

    #[test]
    fn test_register_defaults_to_active() {
        let member = register_member(details(), Utc::now()).unwrap();
        assert_eq!(member.status, MemberStatus::Active);
        assert_eq!(member.email, "siti@example.com");
        assert_eq!(member.phone, None);
    }

    #[test]
    fn test_register_rejects_bad_email() {
        let mut d = details();
        d.email = "not-an-email".to_string();
        assert_eq!(register_member(d, Utc::now()), Err(MemberError::InvalidEmail));
    }

    #[test]
    fn test_edit_keeps_status_unless_given() {
        let mut member = register_member(details(), Utc::now()).unwrap();
        member.status = MemberStatus::Suspended;
        let edited = edit_member(&member, details(), Utc::now()).unwrap();
        assert_eq!(edited.status, MemberStatus::Suspended);
        assert_eq!(edited.member_id, member.member_id);
    }
}
