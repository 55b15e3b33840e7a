use crate::domain::payment::{IntentStatus, NewPayment, Payment, PaymentIntent, Price};
use crate::domain::ports::{ClassStoreBox, InsertOutcome, PaymentProviderBox, PaymentStoreBox};
use crate::error::{Result, WorkflowError};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    /// Currency every intent is requested in.
    pub currency: String,
    /// When set, a payment is only recorded for a provider intent that has
    /// succeeded for exactly the recorded price.
    pub require_confirmed_charge: bool,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            require_confirmed_charge: true,
        }
    }
}

/// Wraps the external payment-intent API and records completed purchases.
pub struct PaymentBridge {
    payments: PaymentStoreBox,
    classes: ClassStoreBox,
    provider: PaymentProviderBox,
    settings: PaymentSettings,
}

impl PaymentBridge {
    pub fn new(
        payments: PaymentStoreBox,
        classes: ClassStoreBox,
        provider: PaymentProviderBox,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            payments,
            classes,
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &PaymentSettings {
        &self.settings
    }

    /// Requests an intent for `price` (major units) converted to minor units.
    pub async fn create_payment_intent(&self, price: Decimal) -> Result<PaymentIntent> {
        let amount = Price::new(price)?.to_minor_units()?;
        match self
            .provider
            .create_intent(amount, &self.settings.currency)
            .await
        {
            Ok(intent) => {
                info!(intent = %intent.id, amount, currency = %intent.currency, "payment intent created");
                Ok(intent)
            }
            Err(e) => {
                error!(amount, error = %e, "payment intent creation failed");
                Err(e)
            }
        }
    }

    /// Records a completed purchase of an existing class.
    pub async fn record_payment(&self, new_payment: NewPayment) -> Result<Payment> {
        let payment = Payment::record(new_payment)?;

        let class = self
            .classes
            .find_one(payment.class_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("class", payment.class_id))?;
        if class.price != payment.price {
            return Err(WorkflowError::validation(format!(
                "Paid price {} does not match class price {}",
                payment.price.value(),
                class.price.value()
            )));
        }

        if self.settings.require_confirmed_charge {
            self.verify_charge(&payment).await?;
        }

        match self.payments.insert_unless_recorded(payment).await? {
            InsertOutcome::Inserted(payment) => {
                info!(id = %payment.id, email = %payment.email, class = %payment.class_id, "payment recorded");
                Ok(payment)
            }
            InsertOutcome::Existing(existing) => {
                warn!(id = %existing.id, transaction = ?existing.transaction_id, "payment already recorded");
                Err(WorkflowError::conflict(format!(
                    "Transaction {} is already recorded as payment {}",
                    existing.transaction_id.as_deref().unwrap_or_default(),
                    existing.id
                )))
            }
        }
    }

    async fn verify_charge(&self, payment: &Payment) -> Result<()> {
        let intent_id = payment.transaction_id.as_deref().ok_or_else(|| {
            WorkflowError::validation("A confirmed transaction_id is required to record a payment")
        })?;
        let intent = self.provider.retrieve_intent(intent_id).await?;

        if intent.status != IntentStatus::Succeeded {
            warn!(intent = %intent.id, status = ?intent.status, "payment not confirmed by provider");
            return Err(WorkflowError::validation(format!(
                "Payment intent {} has not succeeded",
                intent.id
            )));
        }
        let expected = payment.price.to_minor_units()?;
        if intent.amount != expected
            || !intent.currency.eq_ignore_ascii_case(&self.settings.currency)
        {
            warn!(intent = %intent.id, charged = intent.amount, expected, "charged amount mismatch");
            return Err(WorkflowError::validation(format!(
                "Payment intent {} charged {} {}, expected {expected} {}",
                intent.id, intent.amount, intent.currency, self.settings.currency
            )));
        }
        Ok(())
    }

    /// All payments by `email`, newest first.
    pub async fn list_payments(&self, email: &str) -> Result<Vec<Payment>> {
        let mut payments = self.payments.find_by_email(email.trim()).await?;
        payments.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(payments)
    }
}
