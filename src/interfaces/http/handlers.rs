use crate::application::workflow::TeacherApproval;
use crate::domain::actor::Actor;
use crate::domain::class::{Class, ClassContent, NewClass};
use crate::domain::payment::{NewPayment, Payment};
use crate::domain::ports::{DeleteResult, InsertOutcome, UpdateResult};
use crate::domain::teacher_request::{NewTeacherRequest, TeacherRequest};
use crate::domain::user::{NewUser, User};
use crate::error::WorkflowError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::dto::{
    ExistingUserResp, PaymentIntentReq, PaymentIntentResp, RoleUpdateReq, StatusUpdateReq,
};
use crate::interfaces::http::error::ApiError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

/// Header naming the user on whose behalf a class is edited or deleted.
pub const ACTOR_HEADER: &str = "x-user-email";

type ApiResult<T> = Result<T, ApiError>;

async fn actor_from(state: &AppState, headers: &HeaderMap) -> ApiResult<Actor> {
    let email = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(WorkflowError::Unauthenticated)?;
    Ok(state.workflow.resolve_actor(email).await?)
}

pub async fn health() -> &'static str {
    "server is running"
}

// ---- users ----

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.workflow.list_users().await?))
}

/// `null` when no user has that email.
pub async fn find_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Option<User>>> {
    Ok(Json(state.workflow.find_user(&email).await?))
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> ApiResult<Response> {
    let response = match state.workflow.register_user(req).await? {
        InsertOutcome::Inserted(user) => (StatusCode::CREATED, Json(user)).into_response(),
        InsertOutcome::Existing(user) => Json(ExistingUserResp {
            message: "user already exists",
            user,
        })
        .into_response(),
    };
    Ok(response)
}

pub async fn promote_to_teacher(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<UpdateResult>> {
    Ok(Json(state.workflow.promote_to_teacher(&email).await?))
}

pub async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RoleUpdateReq>,
) -> ApiResult<Json<UpdateResult>> {
    Ok(Json(state.workflow.set_role(&id, &req.role).await?))
}

// ---- teacher requests ----

pub async fn list_teacher_requests(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TeacherRequest>>> {
    Ok(Json(state.workflow.list_teacher_requests().await?))
}

pub async fn submit_teacher_request(
    State(state): State<AppState>,
    Json(req): Json<NewTeacherRequest>,
) -> ApiResult<(StatusCode, Json<TeacherRequest>)> {
    let request = state.workflow.submit_teacher_request(req).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn decide_teacher_request(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(req): Json<StatusUpdateReq>,
) -> ApiResult<Json<UpdateResult>> {
    Ok(Json(
        state
            .workflow
            .decide_teacher_request(&email, &req.status)
            .await?,
    ))
}

pub async fn approve_teacher(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<TeacherApproval>> {
    Ok(Json(state.workflow.approve_teacher(&email).await?))
}

// ---- classes ----

pub async fn submit_class(
    State(state): State<AppState>,
    Json(req): Json<NewClass>,
) -> ApiResult<(StatusCode, Json<Class>)> {
    let class = state.workflow.submit_class(req).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn list_classes(State(state): State<AppState>) -> ApiResult<Json<Vec<Class>>> {
    Ok(Json(state.workflow.list_classes().await?))
}

pub async fn list_accepted_classes(State(state): State<AppState>) -> ApiResult<Json<Vec<Class>>> {
    Ok(Json(state.workflow.list_accepted_classes().await?))
}

pub async fn list_classes_by_teacher(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Class>>> {
    Ok(Json(state.workflow.list_classes_by_teacher(&email).await?))
}

/// `null` when no class has that id.
pub async fn fetch_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Class>>> {
    Ok(Json(state.workflow.fetch_class(&id).await?))
}

pub async fn edit_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ClassContent>,
) -> ApiResult<Json<UpdateResult>> {
    let actor = actor_from(&state, &headers).await?;
    Ok(Json(state.workflow.edit_class(&actor, &id, req).await?))
}

pub async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<DeleteResult>> {
    let actor = actor_from(&state, &headers).await?;
    Ok(Json(state.workflow.delete_class(&actor, &id).await?))
}

pub async fn decide_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateReq>,
) -> ApiResult<Json<UpdateResult>> {
    Ok(Json(state.workflow.decide_class(&id, &req.status).await?))
}

// ---- payments ----

pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(req): Json<PaymentIntentReq>,
) -> ApiResult<Json<PaymentIntentResp>> {
    let intent = state.payments.create_payment_intent(req.price).await?;
    Ok(Json(PaymentIntentResp {
        client_secret: intent.client_secret,
    }))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Json(req): Json<NewPayment>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let payment = state.payments.record_payment(req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.payments.list_payments(&email).await?))
}
