use crate::domain::id::ObjectId;
use crate::domain::payment::Price;
use crate::domain::status::ApprovalStatus;
use crate::domain::user::normalize_email;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A class offered by a teacher. Students only ever see classes whose status
/// is `Accepted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    /// Instructor display name.
    pub name: String,
    /// Instructor email; the owning teacher.
    pub email: String,
    pub price: Price,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewClass {
    pub title: String,
    pub name: String,
    pub email: String,
    pub price: Price,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The fields a teacher may overwrite on an existing class. Status is not
/// among them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassContent {
    pub title: String,
    pub name: String,
    pub email: String,
    pub price: Price,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassFilter {
    All,
    Status(ApprovalStatus),
    Owner(String),
}

impl ClassFilter {
    pub fn matches(&self, class: &Class) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Status(status) => class.status == *status,
            ClassFilter::Owner(email) => class.email == *email,
        }
    }
}

impl Class {
    pub fn submit(new_class: NewClass) -> Result<Self> {
        Ok(Self {
            id: ObjectId::new(),
            title: new_class.title,
            name: new_class.name,
            email: normalize_email(&new_class.email)?,
            price: new_class.price,
            image: new_class.image,
            description: new_class.description,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Builds the document an edit creates when no class exists under `id`.
    pub fn from_content(id: ObjectId, content: ClassContent) -> Self {
        Self {
            id,
            title: content.title,
            name: content.name,
            email: content.email,
            price: content.price,
            image: content.image,
            description: None,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Overwrites the editable field set; returns whether anything changed.
    pub fn apply_content(&mut self, content: ClassContent) -> bool {
        let changed = self.title != content.title
            || self.name != content.name
            || self.email != content.email
            || self.price != content.price
            || self.image != content.image;
        self.title = content.title;
        self.name = content.name;
        self.email = content.email;
        self.price = content.price;
        self.image = content.image;
        changed
    }
}
