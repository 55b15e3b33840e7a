use crate::domain::id::ObjectId;
use crate::domain::status::ApprovalStatus;
use crate::domain::user::normalize_email;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An application to become a teacher. Deciding it never touches the user's
/// role on its own; see `WorkflowEngine::approve_teacher` for the combined flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTeacherRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub experience: String,
}

impl TeacherRequest {
    pub fn submit(new_request: NewTeacherRequest) -> Result<Self> {
        Ok(Self {
            id: ObjectId::new(),
            email: normalize_email(&new_request.email)?,
            name: new_request.name,
            photo: new_request.photo,
            title: new_request.title,
            category: new_request.category,
            experience: new_request.experience,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
        })
    }
}
