//! Dwolla offsite gateway.
//!
//! The only JSON-payload gateway in the shipped catalog. Callbacks arrive
//! as a JSON body whose `Signature` field is an HMAC-SHA1 proposition over
//! `"<CheckoutId>&<Amount>"` keyed with the application secret. The nested
//! JSON flattens through the shared params machinery, so the signing
//! engine reads the same key/value shape it does for form payloads.

use async_trait::async_trait;

use crate::errors::{OffsiteError, Result};
use crate::gateways::{Integration, IntegrationMode};
use crate::helper::{Helper, HelperOptions};
use crate::mapping::{FieldMapping, FieldTarget};
use crate::notification::{
    NotificationData, Params, PaymentNotification, PaymentStatus, VerificationContext,
};
use crate::returns::{DefaultReturn, PaymentReturn};
use crate::signing::{SecretPlacement, SignatureAlgorithm, SigningSpec};

const SERVICE_URL: &str = "https://www.dwolla.com/payment/pay";

static MAPPING: FieldMapping = FieldMapping::new(&[
    ("order", FieldTarget::Single("orderid")),
    ("account", FieldTarget::Single("destinationid")),
    ("amount", FieldTarget::Single("amount")),
    ("description", FieldTarget::Single("description")),
    ("notify_url", FieldTarget::Single("callback")),
    ("return_url", FieldTarget::Single("redirect")),
    ("credential2", FieldTarget::Single("key")),
]);

fn signature_spec(secret: &str) -> SigningSpec {
    SigningSpec::new(
        SignatureAlgorithm::HmacSha1,
        &["CheckoutId", "Amount"],
        secret,
        SecretPlacement::HmacKey,
        "&",
        "Signature",
    )
}

/// The Dwolla integration.
pub struct Dwolla;

impl Integration for Dwolla {
    fn id(&self) -> &'static str {
        "dwolla"
    }

    fn service_url(&self, mode: IntegrationMode) -> Result<&'static str> {
        // Dwolla has no separate sandbox host; test transactions carry a
        // `test` flag instead
        match mode {
            IntegrationMode::Production | IntegrationMode::Test => Ok(SERVICE_URL),
            IntegrationMode::Simulate => Err(OffsiteError::UnsupportedMode {
                gateway: self.id(),
                mode,
            }),
        }
    }

    fn helper(
        &self,
        order: &str,
        account: &str,
        options: HelperOptions,
        mode: IntegrationMode,
    ) -> Result<Helper> {
        let mut helper = Helper::new(order, account, &MAPPING, options, mode);
        if helper.test() {
            helper.add_field("test", "true");
        }
        Ok(helper)
    }

    fn notification(
        &self,
        raw: &str,
        context: VerificationContext,
    ) -> Result<Box<dyn PaymentNotification>> {
        Ok(Box::new(DwollaNotification::parse(raw, context)))
    }

    fn returning(
        &self,
        query_string: &str,
        _context: VerificationContext,
    ) -> Result<Box<dyn PaymentReturn>> {
        Ok(Box::new(DefaultReturn::parse(query_string)))
    }
}

/// One parsed Dwolla callback.
#[derive(Debug, Clone)]
pub struct DwollaNotification {
    data: NotificationData,
}

impl DwollaNotification {
    /// Parses a raw JSON callback body.
    pub fn parse(raw: &str, context: VerificationContext) -> Self {
        Self {
            data: NotificationData::from_json(raw, context),
        }
    }
}

#[async_trait]
impl PaymentNotification for DwollaNotification {
    fn params(&self) -> &Params {
        &self.data.params
    }

    fn raw(&self) -> &str {
        &self.data.raw
    }

    fn context(&self) -> &VerificationContext {
        &self.data.context
    }

    fn status(&self) -> PaymentStatus {
        match self.params().get("Status") {
            Some("Completed") => PaymentStatus::Completed,
            Some("Failed") => PaymentStatus::Failed,
            Some("Cancelled") => PaymentStatus::Cancelled,
            Some(other) => PaymentStatus::Unknown(other.to_string()),
            None => PaymentStatus::Unknown(String::new()),
        }
    }

    fn gross(&self) -> Option<String> {
        self.params().get("Amount").map(str::to_string)
    }

    fn transaction_id(&self) -> Option<String> {
        self.params().get("TransactionId").map(str::to_string)
    }

    fn item_id(&self) -> Option<String> {
        self.params().get("OrderId").map(str::to_string)
    }

    fn test(&self) -> bool {
        self.params().get("TestMode") == Some("true")
    }

    async fn acknowledge(&self) -> bool {
        let Some(secret) = self.data.context.secret.as_deref() else {
            tracing::warn!("no application secret configured, cannot verify");
            return false;
        };
        let Some(presented) = self.params().get("Signature") else {
            return false;
        };
        signature_spec(secret).verify(&self.params().lookup(), presented)
    }
}
