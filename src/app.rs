//! Wires stores and the payment provider into the application state.

use crate::application::payments::PaymentBridge;
use crate::application::workflow::WorkflowEngine;
use crate::config::Config;
use crate::domain::ports::{
    ClassStoreBox, PaymentProviderBox, PaymentStoreBox, TeacherRequestStoreBox, UserStoreBox,
};
use crate::error::Result;
use crate::infrastructure::in_memory::{
    InMemoryClassStore, InMemoryPaymentProvider, InMemoryPaymentStore,
    InMemoryTeacherRequestStore, InMemoryUserStore,
};
use crate::infrastructure::stripe::StripeProvider;
use crate::interfaces::http::AppState;
use std::path::Path;
use tracing::{info, warn};

/// One boxed handle per collection. The class collection is needed by both the
/// workflow engine and the payment bridge, hence two handles onto the same store.
pub struct Stores {
    pub users: UserStoreBox,
    pub teacher_requests: TeacherRequestStoreBox,
    pub workflow_classes: ClassStoreBox,
    pub payment_classes: ClassStoreBox,
    pub payments: PaymentStoreBox,
}

impl Stores {
    pub fn in_memory() -> Self {
        let classes = InMemoryClassStore::new();
        Self {
            users: Box::new(InMemoryUserStore::new()),
            teacher_requests: Box::new(InMemoryTeacherRequestStore::new()),
            workflow_classes: Box::new(classes.clone()),
            payment_classes: Box::new(classes),
            payments: Box::new(InMemoryPaymentStore::new()),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb(path: &Path) -> Result<Self> {
        let store = crate::infrastructure::rocksdb::RocksDBStore::open(path)?;
        Ok(Self {
            users: Box::new(store.clone()),
            teacher_requests: Box::new(store.clone()),
            workflow_classes: Box::new(store.clone()),
            payment_classes: Box::new(store.clone()),
            payments: Box::new(store),
        })
    }
}

#[cfg(feature = "storage-rocksdb")]
pub fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    match db_path {
        Some(path) => {
            info!(path = %path.display(), "using RocksDB storage");
            Stores::rocksdb(path)
        }
        None => {
            info!("using in-memory storage");
            Ok(Stores::in_memory())
        }
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
pub fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    } else {
        info!("using in-memory storage");
    }
    Ok(Stores::in_memory())
}

pub fn payment_provider(config: &Config) -> PaymentProviderBox {
    match &config.stripe_secret_key {
        Some(key) => Box::new(StripeProvider::new(key.clone(), config.stripe_api_base.clone())),
        None => {
            warn!("no STRIPE_SECRET_KEY configured, payment intents are simulated in-process");
            Box::new(InMemoryPaymentProvider::new())
        }
    }
}

pub fn build_state(config: &Config) -> Result<AppState> {
    let stores = open_stores(config.db_path.as_deref())?;
    let workflow = WorkflowEngine::new(stores.users, stores.teacher_requests, stores.workflow_classes);
    let payments = PaymentBridge::new(
        stores.payments,
        stores.payment_classes,
        payment_provider(config),
        config.payment_settings(),
    );
    if !payments.settings().require_confirmed_charge {
        warn!("payments are recorded without provider confirmation");
    }
    Ok(AppState::new(workflow, payments))
}
