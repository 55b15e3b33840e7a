use crate::domain::id::ObjectId;
use crate::domain::user::normalize_email;
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A strictly positive price in major currency units (e.g. dollars).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(WorkflowError::validation("Price must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to minor units (cents): multiplied by 100, fractional part truncated.
    pub fn to_minor_units(&self) -> Result<i64> {
        (self.0 * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .ok_or_else(|| WorkflowError::validation("Price is out of range"))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = WorkflowError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// A completed purchase. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub price: Price,
    pub class_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPayment {
    pub email: String,
    pub price: Price,
    /// Hex id of the purchased class. Parsed in `Payment::record` so that a
    /// malformed id is a validation error.
    pub class_id: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl Payment {
    pub fn record(new_payment: NewPayment) -> Result<Self> {
        Ok(Self {
            id: ObjectId::new(),
            email: normalize_email(&new_payment.email)?,
            price: new_payment.price,
            class_id: new_payment.class_id.trim().parse()?,
            class_name: new_payment.class_name,
            transaction_id: new_payment.transaction_id,
            date: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// A provider-side payment intent. The caller completes the charge client-side
/// with `client_secret`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
}
