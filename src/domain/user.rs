use crate::domain::id::ObjectId;
use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(WorkflowError::validation(format!(
                "Unknown role '{other}', expected one of student, teacher, admin"
            ))),
        }
    }
}

/// A registered platform user. Identity key is `email`; `id` is the handle used
/// by the generic role-edit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Registration payload. Any role supplied by a client is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
}

impl User {
    pub fn register(new_user: NewUser) -> Result<Self> {
        let email = normalize_email(&new_user.email)?;
        Ok(Self {
            id: ObjectId::new(),
            email,
            name: new_user.name.trim().to_string(),
            photo: new_user.photo,
            role: Role::Student,
        })
    }
}

/// Trims and checks that an email looks like one. Lookups are exact-match, so
/// every write path runs its key through here first.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_string())
        }
        _ => Err(WorkflowError::validation(format!(
            "Invalid email address: '{email}'"
        ))),
    }
}
