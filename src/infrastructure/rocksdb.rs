use crate::domain::class::{Class, ClassContent, ClassFilter};
use crate::domain::id::ObjectId;
use crate::domain::payment::Payment;
use crate::domain::ports::{
    ClassStore, DeleteResult, InsertOutcome, PaymentStore, TeacherRequestStore, UpdateResult,
    UserKey, UserStore,
};
use crate::domain::status::ApprovalStatus;
use crate::domain::teacher_request::TeacherRequest;
use crate::domain::user::{Role, User};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for users.
pub const CF_USERS: &str = "users";
/// Column Family for teacher requests.
pub const CF_TEACHER_REQUESTS: &str = "teacher_requests";
/// Column Family for classes.
pub const CF_CLASSES: &str = "classes";
/// Column Family for payments.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent store implementation using RocksDB.
///
/// Every collection lives in its own Column Family, keyed by the 12 raw bytes of
/// the document's `ObjectId` and holding the document as JSON. Since ids are
/// big-endian timestamps first, a forward iteration yields creation order.
///
/// Read-modify-write paths (guards, updates, deletes) run under a single
/// writer mutex so that two concurrent registrations for one email cannot both
/// insert. Plain reads never take it.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// four collection Column Families when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_USERS, CF_TEACHER_REQUESTS, CF_CLASSES, CF_PAYMENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| WorkflowError::Storage(format!("Column family '{name}' not found")))
    }

    fn put<T: Serialize>(&self, cf_name: &str, id: ObjectId, doc: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, id.bytes(), serde_json::to_vec(doc)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, id: ObjectId) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, id.bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut docs = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            docs.push(serde_json::from_slice(&value)?);
        }
        Ok(docs)
    }
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn find_all(&self) -> Result<Vec<User>> {
        self.scan(CF_USERS)
    }

    async fn find_one(&self, key: &UserKey) -> Result<Option<User>> {
        match key {
            UserKey::Id(id) => self.get(CF_USERS, *id),
            UserKey::Email(_) => Ok(self
                .scan::<User>(CF_USERS)?
                .into_iter()
                .find(|u| key.matches(u))),
        }
    }

    async fn insert_if_absent(&self, user: User) -> Result<InsertOutcome<User>> {
        let _guard = self.writer.lock().await;
        let existing = self
            .scan::<User>(CF_USERS)?
            .into_iter()
            .find(|u| u.email == user.email);
        if let Some(existing) = existing {
            return Ok(InsertOutcome::Existing(existing));
        }
        self.put(CF_USERS, user.id, &user)?;
        Ok(InsertOutcome::Inserted(user))
    }

    async fn set_role(&self, key: &UserKey, role: Role) -> Result<UpdateResult> {
        let _guard = self.writer.lock().await;
        let Some(mut user) = UserStore::find_one(self, key).await? else {
            return Ok(UpdateResult::unmatched());
        };
        let modified = user.role != role;
        user.role = role;
        self.put(CF_USERS, user.id, &user)?;
        Ok(UpdateResult::matched(modified))
    }
}

#[async_trait]
impl TeacherRequestStore for RocksDBStore {
    async fn find_all(&self) -> Result<Vec<TeacherRequest>> {
        self.scan(CF_TEACHER_REQUESTS)
    }

    async fn find_latest(&self, email: &str) -> Result<Option<TeacherRequest>> {
        Ok(self
            .scan::<TeacherRequest>(CF_TEACHER_REQUESTS)?
            .into_iter()
            .rev()
            .find(|r| r.email == email))
    }

    async fn insert_unless_pending(
        &self,
        request: TeacherRequest,
    ) -> Result<InsertOutcome<TeacherRequest>> {
        let _guard = self.writer.lock().await;
        let pending = self
            .scan::<TeacherRequest>(CF_TEACHER_REQUESTS)?
            .into_iter()
            .find(|r| r.email == request.email && r.status == ApprovalStatus::Pending);
        if let Some(pending) = pending {
            return Ok(InsertOutcome::Existing(pending));
        }
        self.put(CF_TEACHER_REQUESTS, request.id, &request)?;
        Ok(InsertOutcome::Inserted(request))
    }

    async fn set_status_if(
        &self,
        id: ObjectId,
        expected: ApprovalStatus,
        status: ApprovalStatus,
    ) -> Result<UpdateResult> {
        let _guard = self.writer.lock().await;
        let Some(mut request) = self.get::<TeacherRequest>(CF_TEACHER_REQUESTS, id)? else {
            return Ok(UpdateResult::unmatched());
        };
        if request.status != expected {
            return Ok(UpdateResult::unmatched());
        }
        request.status = status;
        self.put(CF_TEACHER_REQUESTS, id, &request)?;
        Ok(UpdateResult::matched(expected != status))
    }
}

#[async_trait]
impl ClassStore for RocksDBStore {
    async fn find(&self, filter: &ClassFilter) -> Result<Vec<Class>> {
        Ok(self
            .scan::<Class>(CF_CLASSES)?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect())
    }

    async fn find_one(&self, id: ObjectId) -> Result<Option<Class>> {
        self.get(CF_CLASSES, id)
    }

    async fn insert(&self, class: Class) -> Result<ObjectId> {
        let _guard = self.writer.lock().await;
        self.put(CF_CLASSES, class.id, &class)?;
        Ok(class.id)
    }

    async fn set_status_if(
        &self,
        id: ObjectId,
        expected: ApprovalStatus,
        status: ApprovalStatus,
    ) -> Result<UpdateResult> {
        let _guard = self.writer.lock().await;
        let Some(mut class) = self.get::<Class>(CF_CLASSES, id)? else {
            return Ok(UpdateResult::unmatched());
        };
        if class.status != expected {
            return Ok(UpdateResult::unmatched());
        }
        class.status = status;
        self.put(CF_CLASSES, id, &class)?;
        Ok(UpdateResult::matched(expected != status))
    }

    async fn upsert_content(&self, id: ObjectId, content: ClassContent) -> Result<UpdateResult> {
        let _guard = self.writer.lock().await;
        match self.get::<Class>(CF_CLASSES, id)? {
            Some(mut class) => {
                let modified = class.apply_content(content);
                self.put(CF_CLASSES, id, &class)?;
                Ok(UpdateResult::matched(modified))
            }
            None => {
                self.put(CF_CLASSES, id, &Class::from_content(id, content))?;
                Ok(UpdateResult::upserted(id))
            }
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<DeleteResult> {
        let _guard = self.writer.lock().await;
        let cf = self.cf(CF_CLASSES)?;
        if self.db.get_pinned_cf(cf, id.bytes())?.is_none() {
            return Ok(DeleteResult { deleted_count: 0 });
        }
        self.db.delete_cf(cf, id.bytes())?;
        Ok(DeleteResult { deleted_count: 1 })
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert_unless_recorded(&self, payment: Payment) -> Result<InsertOutcome<Payment>> {
        let _guard = self.writer.lock().await;
        if payment.transaction_id.is_some() {
            let existing = self
                .scan::<Payment>(CF_PAYMENTS)?
                .into_iter()
                .find(|p| p.transaction_id == payment.transaction_id);
            if let Some(existing) = existing {
                return Ok(InsertOutcome::Existing(existing));
            }
        }
        self.put(CF_PAYMENTS, payment.id, &payment)?;
        Ok(InsertOutcome::Inserted(payment))
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Payment>> {
        Ok(self
            .scan::<Payment>(CF_PAYMENTS)?
            .into_iter()
            .filter(|p| p.email == email)
            .collect())
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
    use tempfile::tempdir;

    fn user(email: &str) -> User {
        User::register(NewUser {
            email: email.to_string(),
            name: "Test".to_string(),
            photo: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in [CF_USERS, CF_TEACHER_REQUESTS, CF_CLASSES, CF_PAYMENTS] {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_user_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let u = user("a@x.com");
        assert!(matches!(
            store.insert_if_absent(u.clone()).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert!(matches!(
            store.insert_if_absent(user("a@x.com")).await.unwrap(),
            InsertOutcome::Existing(existing) if existing.id == u.id
        ));

        let key = UserKey::Email("a@x.com".to_string());
        let result = store.set_role(&key, Role::Teacher).await.unwrap();
        assert_eq!(result, UpdateResult::matched(true));

        let stored = UserStore::find_one(&store, &UserKey::Id(u.id)).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Teacher);
        assert_eq!(UserStore::find_all(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_class_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let class = Class::submit(NewClass {
            title: "Rust 101".to_string(),
            name: "Grace".to_string(),
            email: "t@x.com".to_string(),
            price: Price::new(dec!(30.0)).unwrap(),
            image: String::new(),
            description: None,
        })
        .unwrap();
        let id = ClassStore::insert(&store, class).await.unwrap();
        ClassStore::set_status_if(&store, id, ApprovalStatus::Pending, ApprovalStatus::Accepted)
            .await
            .unwrap();

        let accepted = store
            .find(&ClassFilter::Status(ApprovalStatus::Accepted))
            .await
            .unwrap();
        assert_eq!(accepted.len(), 1);

        assert_eq!(store.delete(id).await.unwrap().deleted_count, 1);
        assert!(ClassStore::find_one(&store, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        let payment = Payment::record(NewPayment {
            email: "s@x.com".to_string(),
            price: Price::new(dec!(20.0)).unwrap(),
            class_id: ObjectId::new().to_string(),
            class_name: None,
            transaction_id: Some("pi_1".to_string()),
        })
        .unwrap();

        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.insert_unless_recorded(payment.clone()).await.unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        let payments = store.find_by_email("s@x.com").await.unwrap();
        assert_eq!(payments, vec![payment.clone()]);

        // The transaction guard holds across restarts
        let replay = Payment::record(NewPayment {
            email: "s@x.com".to_string(),
            price: Price::new(dec!(20.0)).unwrap(),
            class_id: payment.class_id.to_string(),
            class_name: None,
            transaction_id: Some("pi_1".to_string()),
        })
        .unwrap();
        assert_eq!(
            store.insert_unless_recorded(replay).await.unwrap(),
            InsertOutcome::Existing(payment)
        );
        assert_eq!(store.find_by_email("s@x.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_teacher_request_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
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
        assert_eq!(TeacherRequestStore::find_all(&store).await.unwrap().len(), 1);

        let stale = TeacherRequestStore::set_status_if(
            &store,
            first.id,
            ApprovalStatus::Accepted,
            ApprovalStatus::Rejected,
        )
        .await
        .unwrap();
        assert!(stale.is_unmatched());
        let result = TeacherRequestStore::set_status_if(
            &store,
            first.id,
            ApprovalStatus::Pending,
            ApprovalStatus::Rejected,
        )
        .await
        .unwrap();
        assert_eq!(result, UpdateResult::matched(true));

        let second = new_request();
        assert!(matches!(
            store.insert_unless_pending(second.clone()).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        let latest = store.find_latest("a@x.com").await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.status, ApprovalStatus::Pending);
        assert!(store.find_latest("b@x.com").await.unwrap().is_none());
        assert_eq!(TeacherRequestStore::find_all(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rocksdb_class_store_upsert_keeps_status() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let class = Class::submit(NewClass {
            title: "Rust 101".to_string(),
            name: "Grace".to_string(),
            email: "t@x.com".to_string(),
            price: Price::new(dec!(30.0)).unwrap(),
            image: String::new(),
            description: None,
        })
        .unwrap();
        let id = ClassStore::insert(&store, class.clone()).await.unwrap();
        ClassStore::set_status_if(&store, id, ApprovalStatus::Pending, ApprovalStatus::Accepted)
            .await
            .unwrap();

        let content = ClassContent {
            title: "Rust 201".to_string(),
            name: class.name.clone(),
            email: class.email.clone(),
            price: Price::new(dec!(35.0)).unwrap(),
            image: class.image.clone(),
        };
        let result = store.upsert_content(id, content.clone()).await.unwrap();
        assert_eq!(result, UpdateResult::matched(true));
        let result = store.upsert_content(id, content.clone()).await.unwrap();
        assert_eq!(result, UpdateResult::matched(false));

        let stored = ClassStore::find_one(&store, id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Rust 201");
        assert_eq!(stored.price.value(), dec!(35.0));
        assert_eq!(stored.status, ApprovalStatus::Accepted);

        let fresh = ObjectId::new();
        let result = store.upsert_content(fresh, content).await.unwrap();
        assert_eq!(result.upserted_id, Some(fresh));
        let created = ClassStore::find_one(&store, fresh).await.unwrap().unwrap();
        assert_eq!(created.status, ApprovalStatus::Pending);
        assert_eq!(store.find(&ClassFilter::All).await.unwrap().len(), 2);
    }
}
