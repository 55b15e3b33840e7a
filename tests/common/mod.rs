#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use edutrack::application::payments::{PaymentBridge, PaymentSettings};
use edutrack::application::workflow::WorkflowEngine;
use edutrack::domain::class::NewClass;
use edutrack::domain::payment::Price;
use edutrack::domain::teacher_request::NewTeacherRequest;
use edutrack::domain::user::NewUser;
use edutrack::infrastructure::in_memory::{
    InMemoryClassStore, InMemoryPaymentProvider, InMemoryPaymentStore,
    InMemoryTeacherRequestStore, InMemoryUserStore,
};
use edutrack::interfaces::http::{AppState, router};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

pub struct Harness {
    pub state: AppState,
    pub provider: InMemoryPaymentProvider,
}

pub fn harness() -> Harness {
    harness_with(PaymentSettings::default())
}

pub fn harness_with(settings: PaymentSettings) -> Harness {
    let classes = InMemoryClassStore::new();
    let provider = InMemoryPaymentProvider::new();
    let workflow = WorkflowEngine::new(
        Box::new(InMemoryUserStore::new()),
        Box::new(InMemoryTeacherRequestStore::new()),
        Box::new(classes.clone()),
    );
    let payments = PaymentBridge::new(
        Box::new(InMemoryPaymentStore::new()),
        Box::new(classes),
        Box::new(provider.clone()),
        settings,
    );
    Harness {
        state: AppState::new(workflow, payments),
        provider,
    }
}

impl Harness {
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }
}

pub fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: "Test User".to_string(),
        photo: None,
    }
}

pub fn new_request(email: &str) -> NewTeacherRequest {
    NewTeacherRequest {
        email: email.to_string(),
        name: "Test User".to_string(),
        photo: None,
        title: "Backend engineering".to_string(),
        category: "programming".to_string(),
        experience: "experienced".to_string(),
    }
}

pub fn new_class(email: &str, price: Decimal) -> NewClass {
    NewClass {
        title: "Intro to Rust".to_string(),
        name: "Test Teacher".to_string(),
        email: email.to_string(),
        price: Price::new(price).unwrap(),
        image: "https://img.example/rust.png".to_string(),
        description: None,
    }
}

/// Sends one request through the router and decodes the body as JSON, falling
/// back to a JSON string for plain-text bodies.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
