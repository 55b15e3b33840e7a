use crate::domain::class::{Class, ClassContent, ClassFilter};
use crate::domain::id::ObjectId;
use crate::domain::payment::{IntentStatus, Payment, PaymentIntent};
use crate::domain::ports::{
    ClassStore, DeleteResult, InsertOutcome, PaymentProvider, PaymentStore, TeacherRequestStore,
    UpdateResult, UserKey, UserStore,
};
use crate::domain::status::ApprovalStatus;
use crate::domain::teacher_request::TeacherRequest;
use crate::domain::user::{Role, User};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Shared, ordered document map. `ObjectId` order is creation order, so
/// iterating the map gives insertion-ordered listings.
type Collection<T> = Arc<RwLock<BTreeMap<ObjectId, T>>>;

/// A thread-safe in-memory user collection.
///
/// The write lock is held across the email lookup in `insert_if_absent`, which
/// is what makes registration a genuine existence guard.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Collection<User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_all(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }

    async fn find_one(&self, key: &UserKey) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| key.matches(u)).cloned())
    }

    async fn insert_if_absent(&self, user: User) -> Result<InsertOutcome<User>> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.values().find(|u| u.email == user.email) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(InsertOutcome::Inserted(user))
    }

    async fn set_role(&self, key: &UserKey, role: Role) -> Result<UpdateResult> {
        let mut users = self.users.write().await;
        match users.values_mut().find(|u| key.matches(u)) {
            Some(user) => {
                let modified = user.role != role;
                user.role = role;
                Ok(UpdateResult::matched(modified))
            }
            None => Ok(UpdateResult::unmatched()),
        }
    }
}

/// A thread-safe in-memory teacher request collection.
#[derive(Default, Clone)]
pub struct InMemoryTeacherRequestStore {
    requests: Collection<TeacherRequest>,
}

impl InMemoryTeacherRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeacherRequestStore for InMemoryTeacherRequestStore {
    async fn find_all(&self) -> Result<Vec<TeacherRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.values().cloned().collect())
    }

    async fn find_latest(&self, email: &str) -> Result<Option<TeacherRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.values().rev().find(|r| r.email == email).cloned())
    }

    async fn insert_unless_pending(
        &self,
        request: TeacherRequest,
    ) -> Result<InsertOutcome<TeacherRequest>> {
        let mut requests = self.requests.write().await;
        if let Some(pending) = requests
            .values()
            .find(|r| r.email == request.email && r.status == ApprovalStatus::Pending)
        {
            return Ok(InsertOutcome::Existing(pending.clone()));
        }
        requests.insert(request.id, request.clone());
        Ok(InsertOutcome::Inserted(request))
    }

    async fn set_status_if(
        &self,
        id: ObjectId,
        expected: ApprovalStatus,
        status: ApprovalStatus,
    ) -> Result<UpdateResult> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&id) {
            Some(request) if request.status == expected => {
                request.status = status;
                Ok(UpdateResult::matched(expected != status))
            }
            _ => Ok(UpdateResult::unmatched()),
        }
    }
}

/// A thread-safe in-memory class collection.
#[derive(Default, Clone)]
pub struct InMemoryClassStore {
    classes: Collection<Class>,
}

impl InMemoryClassStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClassStore for InMemoryClassStore {
    async fn find(&self, filter: &ClassFilter) -> Result<Vec<Class>> {
        let classes = self.classes.read().await;
        Ok(classes.values().filter(|c| filter.matches(c)).cloned().collect())
    }

    async fn find_one(&self, id: ObjectId) -> Result<Option<Class>> {
        let classes = self.classes.read().await;
        Ok(classes.get(&id).cloned())
    }

    async fn insert(&self, class: Class) -> Result<ObjectId> {
        let mut classes = self.classes.write().await;
        let id = class.id;
        classes.insert(id, class);
        Ok(id)
    }

    async fn set_status_if(
        &self,
        id: ObjectId,
        expected: ApprovalStatus,
        status: ApprovalStatus,
    ) -> Result<UpdateResult> {
        let mut classes = self.classes.write().await;
        match classes.get_mut(&id) {
            Some(class) if class.status == expected => {
                class.status = status;
                Ok(UpdateResult::matched(expected != status))
            }
            _ => Ok(UpdateResult::unmatched()),
        }
    }

    async fn upsert_content(&self, id: ObjectId, content: ClassContent) -> Result<UpdateResult> {
        let mut classes = self.classes.write().await;
        match classes.get_mut(&id) {
            Some(class) => Ok(UpdateResult::matched(class.apply_content(content))),
            None => {
                classes.insert(id, Class::from_content(id, content));
                Ok(UpdateResult::upserted(id))
            }
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<DeleteResult> {
        let mut classes = self.classes.write().await;
        Ok(DeleteResult {
            deleted_count: u64::from(classes.remove(&id).is_some()),
        })
    }
}

/// A thread-safe in-memory payment collection.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Collection<Payment>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert_unless_recorded(&self, payment: Payment) -> Result<InsertOutcome<Payment>> {
        let mut payments = self.payments.write().await;
        if let Some(existing) = payments
            .values()
            .find(|p| p.transaction_id.is_some() && p.transaction_id == payment.transaction_id)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        payments.insert(payment.id, payment.clone());
        Ok(InsertOutcome::Inserted(payment))
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.values().filter(|p| p.email == email).cloned().collect())
    }
}

/// Offline stand-in for the payment provider.
///
/// Intents are created in `requires_payment_method` and only move to
/// `succeeded` through `confirm`, which plays the part of the client-side
/// charge. `fail_next_call` makes the next provider call return an error.
#[derive(Default, Clone)]
pub struct InMemoryPaymentProvider {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
    sequence: Arc<AtomicU64>,
    fail_next: Arc<RwLock<Option<String>>>,
}

impl InMemoryPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn confirm(&self, intent_id: &str) -> Result<()> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| WorkflowError::not_found("payment intent", intent_id))?;
        intent.status = IntentStatus::Succeeded;
        Ok(())
    }

    pub async fn fail_next_call(&self, message: impl Into<String>) {
        *self.fail_next.write().await = Some(message.into());
    }

    pub async fn intents(&self) -> Vec<PaymentIntent> {
        self.intents.read().await.values().cloned().collect()
    }

    async fn take_failure(&self) -> Result<()> {
        match self.fail_next.write().await.take() {
            Some(message) => Err(WorkflowError::ExternalService(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    async fn create_intent(&self, amount_minor_units: i64, currency: &str) -> Result<PaymentIntent> {
        self.take_failure().await?;
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let intent = PaymentIntent {
            id: format!("pi_local_{n}"),
            client_secret: format!("pi_local_{n}_secret_{:016x}", rand::random::<u64>()),
            amount: amount_minor_units,
            currency: currency.to_string(),
            status: IntentStatus::RequiresPaymentMethod,
        };
        self.intents
            .write()
            .await
            .insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.take_failure().await?;
        self.intents
            .read()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| {
                WorkflowError::ExternalService(format!("No such payment intent: '{intent_id}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::class::NewClass;
    use crate::domain::payment::{NewPayment, Price};
    use crate::domain::teacher_request::NewTeacherRequest;
    use crate::domain::user::NewUser;
    use rust_decimal_macros::dec;

    fn user(email: &str) -> User {
        User::register(NewUser {
            email: email.to_string(),
            name: "Test".to_string(),
            photo: None,
        })
        .unwrap()
    }

    fn class(email: &str) -> Class {
        Class::submit(NewClass {
            title: "Rust 101".to_string(),
            name: "Grace".to_string(),
            email: email.to_string(),
            price: Price::new(dec!(10.0)).unwrap(),
            image: String::new(),
            description: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_user_store_insert_if_absent() {
        let store = InMemoryUserStore::new();
        let first = user("a@x.com");

        let outcome = store.insert_if_absent(first.clone()).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(first.clone()));

        let outcome = store.insert_if_absent(user("a@x.com")).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Existing(first));
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_user_store_set_role() {
        let store = InMemoryUserStore::new();
        let u = user("a@x.com");
        store.insert_if_absent(u.clone()).await.unwrap();

        let result = store.set_role(&UserKey::Id(u.id), Role::Admin).await.unwrap();
        assert_eq!(result, UpdateResult::matched(true));
        let result = store.set_role(&UserKey::Id(u.id), Role::Admin).await.unwrap();
        assert_eq!(result, UpdateResult::matched(false));

        let missing = UserKey::Email("b@x.com".to_string());
        assert!(store.set_role(&missing, Role::Teacher).await.unwrap().is_unmatched());
        assert!(store.find_one(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_teacher_request_store() {
        let store = InMemoryTeacherRequestStore::new();
        let new_request = || {
            TeacherRequest::submit(NewTeacherRequest {
                email: "a@x.com".to_string(),
                name: "Ada".to_string(),
                photo: None,
                title: "Rust".to_string(),
                category: "programming".to_string(),
                experience: "beginner".to_string(),
            })
            .unwrap()
        };

        let first = new_request();
        assert!(matches!(
            store.insert_unless_pending(first.clone()).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert!(matches!(
            store.insert_unless_pending(new_request()).await.unwrap(),
            InsertOutcome::Existing(r) if r.id == first.id
        ));

        let stale = store
            .set_status_if(first.id, ApprovalStatus::Accepted, ApprovalStatus::Rejected)
            .await
            .unwrap();
        assert!(stale.is_unmatched());
        store
            .set_status_if(first.id, ApprovalStatus::Pending, ApprovalStatus::Rejected)
            .await
            .unwrap();
        let second = new_request();
        assert!(matches!(
            store.insert_unless_pending(second.clone()).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert_eq!(store.find_latest("a@x.com").await.unwrap().unwrap().id, second.id);
        assert_eq!(store.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_class_store_upsert_and_delete() {
        let store = InMemoryClassStore::new();
        let c = class("t@x.com");
        let id = store.insert(c.clone()).await.unwrap();
        store
            .set_status_if(id, ApprovalStatus::Pending, ApprovalStatus::Accepted)
            .await
            .unwrap();

        let content = ClassContent {
            title: "Rust 201".to_string(),
            name: c.name.clone(),
            email: c.email.clone(),
            price: c.price,
            image: c.image.clone(),
        };
        let result = store.upsert_content(id, content.clone()).await.unwrap();
        assert_eq!(result, UpdateResult::matched(true));
        let stored = store.find_one(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Rust 201");
        assert_eq!(stored.status, ApprovalStatus::Accepted);

        let fresh = ObjectId::new();
        let result = store.upsert_content(fresh, content).await.unwrap();
        assert_eq!(result.upserted_id, Some(fresh));

        assert_eq!(store.delete(id).await.unwrap().deleted_count, 1);
        assert_eq!(store.delete(id).await.unwrap().deleted_count, 0);
        assert!(store.find_one(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_class_store_status_compare_and_set() {
        let store = InMemoryClassStore::new();
        let id = store.insert(class("t@x.com")).await.unwrap();

        let result = store
            .set_status_if(id, ApprovalStatus::Pending, ApprovalStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::matched(true));

        // A decision taken against the old status no longer applies
        let result = store
            .set_status_if(id, ApprovalStatus::Pending, ApprovalStatus::Rejected)
            .await
            .unwrap();
        assert!(result.is_unmatched());
        assert_eq!(
            store.find_one(id).await.unwrap().unwrap().status,
            ApprovalStatus::Accepted
        );

        let missing = store
            .set_status_if(ObjectId::new(), ApprovalStatus::Pending, ApprovalStatus::Accepted)
            .await
            .unwrap();
        assert!(missing.is_unmatched());
    }

    #[tokio::test]
    async fn test_in_memory_payment_store_records_transaction_once() {
        let store = InMemoryPaymentStore::new();
        let payment = |transaction_id: Option<&str>| {
            Payment::record(NewPayment {
                email: "s@x.com".to_string(),
                price: Price::new(dec!(20.0)).unwrap(),
                class_id: ObjectId::new().to_string(),
                class_name: None,
                transaction_id: transaction_id.map(str::to_string),
            })
            .unwrap()
        };

        let first = payment(Some("pi_1"));
        assert_eq!(
            store.insert_unless_recorded(first.clone()).await.unwrap(),
            InsertOutcome::Inserted(first.clone())
        );
        assert_eq!(
            store.insert_unless_recorded(payment(Some("pi_1"))).await.unwrap(),
            InsertOutcome::Existing(first)
        );

        // Untracked payments never collide with each other
        for _ in 0..2 {
            assert!(matches!(
                store.insert_unless_recorded(payment(None)).await.unwrap(),
                InsertOutcome::Inserted(_)
            ));
        }
        assert_eq!(store.find_by_email("s@x.com").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_in_memory_payment_provider_lifecycle() {
        let provider = InMemoryPaymentProvider::new();
        let intent = provider.create_intent(2000, "usd").await.unwrap();
        assert_eq!(intent.amount, 2000);
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);

        provider.confirm(&intent.id).await.unwrap();
        let retrieved = provider.retrieve_intent(&intent.id).await.unwrap();
        assert_eq!(retrieved.status, IntentStatus::Succeeded);

        provider.fail_next_call("card network down").await;
        assert!(matches!(
            provider.create_intent(100, "usd").await,
            Err(WorkflowError::ExternalService(_))
        ));
        assert!(provider.create_intent(100, "usd").await.is_ok());
    }
}
