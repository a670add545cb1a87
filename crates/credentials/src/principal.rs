//! Authorization result of a validated request

use serde::Serialize;

/// Caller identity attached to a request after validation.
///
/// Every valid credential is a super user: there is no role or scope model
/// behind these credentials, so a successful check grants everything the
/// record store allows. Serializes as
/// `{"subject_id": .., "role": {"permission": {"super_user": true}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub permission: Permission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub super_user: bool,
}

impl Principal {
    pub fn super_user(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: Role {
                permission: Permission { super_user: true },
            },
        }
    }

    pub fn is_super_user(&self) -> bool {
        self.role.permission.super_user
    }
}
