use crate::domain::user::User;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of the status-setting admin routes. Kept as a raw string so that
/// unknown values reach the workflow's validation instead of failing JSON
/// extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateReq {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdateReq {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentReq {
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResp {
    pub client_secret: String,
}

/// Returned instead of a new document when registering an existing email.
#[derive(Debug, Clone, Serialize)]
pub struct ExistingUserResp {
    pub message: &'static str,
    pub user: User,
}
