use super::class::{Class, ClassContent, ClassFilter};
use super::id::ObjectId;
use super::payment::{Payment, PaymentIntent};
use super::status::ApprovalStatus;
use super::teacher_request::TeacherRequest;
use super::user::{Role, User};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of a single-document update, mirroring the store's
/// `{matchedCount, modifiedCount, upsertedId}` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<ObjectId>,
}

impl UpdateResult {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn matched(modified: bool) -> Self {
        Self {
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_id: None,
        }
    }

    pub fn upserted(id: ObjectId) -> Self {
        Self {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        }
    }

    pub fn is_unmatched(&self) -> bool {
        self.matched_count == 0 && self.upserted_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    Inserted(T),
    Existing(T),
}

/// Selects a single user either by its identity key or by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Email(String),
    Id(ObjectId),
}

impl UserKey {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserKey::Email(email) => user.email == *email,
            UserKey::Id(id) => user.id == *id,
        }
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserKey::Email(email) => f.write_str(email),
            UserKey::Id(id) => write!(f, "{id}"),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<User>>;
    async fn find_one(&self, key: &UserKey) -> Result<Option<User>>;
    /// Inserts `user` unless a user with the same email exists. Atomic with
    /// respect to other writers of the same store.
    async fn insert_if_absent(&self, user: User) -> Result<InsertOutcome<User>>;
    async fn set_role(&self, key: &UserKey, role: Role) -> Result<UpdateResult>;
}

#[async_trait]
pub trait TeacherRequestStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<TeacherRequest>>;
    /// Most recently submitted request for `email`.
    async fn find_latest(&self, email: &str) -> Result<Option<TeacherRequest>>;
    /// Inserts `request` unless a pending request for the same email exists,
    /// in which case that pending request is returned.
    async fn insert_unless_pending(
        &self,
        request: TeacherRequest,
    ) -> Result<InsertOutcome<TeacherRequest>>;
    /// Sets `status` only while the document's status is still `expected`.
    /// Unmatched when the document is missing or was decided in between.
    async fn set_status_if(
        &self,
        id: ObjectId,
        expected: ApprovalStatus,
        status: ApprovalStatus,
    ) -> Result<UpdateResult>;
}

#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn find(&self, filter: &ClassFilter) -> Result<Vec<Class>>;
    async fn find_one(&self, id: ObjectId) -> Result<Option<Class>>;
    async fn insert(&self, class: Class) -> Result<ObjectId>;
    async fn set_status_if(
        &self,
        id: ObjectId,
        expected: ApprovalStatus,
        status: ApprovalStatus,
    ) -> Result<UpdateResult>;
    /// Overwrites the editable fields, creating the class under `id` when absent.
    async fn upsert_content(&self, id: ObjectId, content: ClassContent) -> Result<UpdateResult>;
    async fn delete(&self, id: ObjectId) -> Result<DeleteResult>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts `payment` unless one with the same `transaction_id` is already
    /// recorded, in which case that payment is returned. Payments without a
    /// transaction id are always inserted. Atomic like
    /// `UserStore::insert_if_absent`.
    async fn insert_unless_recorded(&self, payment: Payment) -> Result<InsertOutcome<Payment>>;
    async fn find_by_email(&self, email: &str) -> Result<Vec<Payment>>;
}

/// External payment-intent API. Each call is a single request; no local retry.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_intent(&self, amount_minor_units: i64, currency: &str) -> Result<PaymentIntent>;
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;
}

pub type UserStoreBox = Box<dyn UserStore>;
pub type TeacherRequestStoreBox = Box<dyn TeacherRequestStore>;
pub type ClassStoreBox = Box<dyn ClassStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentProviderBox = Box<dyn PaymentProvider>;
