//! HTTP surface: one route per workflow operation.

pub mod dto;
pub mod error;
pub mod handlers;

use crate::application::payments::PaymentBridge;
use crate::application::workflow::WorkflowEngine;
use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<WorkflowEngine>,
    pub payments: Arc<PaymentBridge>,
}

impl AppState {
    pub fn new(workflow: WorkflowEngine, payments: PaymentBridge) -> Self {
        Self {
            workflow: Arc::new(workflow),
            payments: Arc::new(payments),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::register_user),
        )
        .route("/user/{email}", get(handlers::find_user))
        .route(
            "/teacher-req",
            get(handlers::list_teacher_requests).post(handlers::submit_teacher_request),
        )
        .route("/admin/teacher/{email}", patch(handlers::promote_to_teacher))
        .route("/admin/admin/{id}", patch(handlers::set_role))
        .route(
            "/admin/teacher-req/{email}",
            patch(handlers::decide_teacher_request),
        )
        .route(
            "/admin/teacher-req/{email}/approve",
            patch(handlers::approve_teacher),
        )
        .route("/add-class", post(handlers::submit_class))
        .route("/classes", get(handlers::list_classes))
        .route("/classes/student", get(handlers::list_accepted_classes))
        .route("/classes/{email}", get(handlers::list_classes_by_teacher))
        .route("/classes/single/{id}", get(handlers::fetch_class))
        .route("/class/update/{id}", patch(handlers::edit_class))
        .route("/class/{id}", delete(handlers::delete_class))
        .route("/add-class-action/{id}", patch(handlers::decide_class))
        .route(
            "/create-payment-intent",
            post(handlers::create_payment_intent),
        )
        .route("/payment", post(handlers::record_payment))
        .route("/payment/{email}", get(handlers::list_payments))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for a single browser origin with credentials.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(handlers::ACTOR_HEADER)]))
}
