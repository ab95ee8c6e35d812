//! PayPal Website Payments Standard.
//!
//! Outbound: a `_xclick` form posted to the PayPal hosted page. Inbound:
//! the classic IPN — a form-urlencoded POST verified by re-posting the
//! exact raw body back to PayPal with `cmd=_notify-validate` and requiring
//! the literal response `VERIFIED`. Anything else, including network
//! failure or timeout, leaves the notification unacknowledged.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::{OffsiteError, Result};
use crate::gateways::{Integration, IntegrationMode};
use crate::helper::{Helper, HelperOptions};
use crate::mapping::{FieldMapping, FieldTarget};
use crate::notification::{
    NotificationData, Params, PaymentNotification, PaymentStatus, VerificationContext,
};
use crate::returns::{DefaultReturn, PaymentReturn};

const PRODUCTION_URL: &str = "https://www.paypal.com/cgi-bin/webscr";
const TEST_URL: &str = "https://www.sandbox.paypal.com/cgi-bin/webscr";

static MAPPING: FieldMapping = FieldMapping::new(&[
    ("order", FieldTarget::Single("invoice")),
    ("account", FieldTarget::Single("business")),
    ("amount", FieldTarget::Single("amount")),
    ("currency", FieldTarget::Single("currency_code")),
    ("notify_url", FieldTarget::Single("notify_url")),
    ("return_url", FieldTarget::Single("return")),
    ("description", FieldTarget::Single("item_name")),
    ("account_name", FieldTarget::Single("item_name")),
    (
        "customer",
        FieldTarget::Composite(&[
            ("first_name", "first_name"),
            ("last_name", "last_name"),
            ("email", "email"),
        ]),
    ),
    (
        "billing_address",
        FieldTarget::Composite(&[
            ("address1", "address1"),
            ("address2", "address2"),
            ("city", "city"),
            ("state", "state"),
            ("zip", "zip"),
            ("country", "country"),
        ]),
    ),
]);

/// The PayPal integration.
pub struct Paypal;

impl Integration for Paypal {
    fn id(&self) -> &'static str {
        "paypal"
    }

    fn service_url(&self, mode: IntegrationMode) -> Result<&'static str> {
        match mode {
            IntegrationMode::Production => Ok(PRODUCTION_URL),
            IntegrationMode::Test => Ok(TEST_URL),
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
        helper.add_field("cmd", "_xclick");
        helper.add_field("charset", "utf-8");
        helper.add_field("no_note", "1");
        Ok(helper)
    }

    fn notification(
        &self,
        raw: &str,
        context: VerificationContext,
    ) -> Result<Box<dyn PaymentNotification>> {
        Ok(Box::new(PaypalNotification::parse(raw, context)))
    }

    fn returning(
        &self,
        query_string: &str,
        _context: VerificationContext,
    ) -> Result<Box<dyn PaymentReturn>> {
        // PayPal only redirects back on success; the base defaults hold
        Ok(Box::new(DefaultReturn::parse(query_string)))
    }
}

/// One parsed PayPal IPN.
#[derive(Debug, Clone)]
pub struct PaypalNotification {
    data: NotificationData,
    verification_url: Option<String>,
}

impl PaypalNotification {
    /// Parses a raw IPN POST body.
    pub fn parse(raw: &str, context: VerificationContext) -> Self {
        Self {
            data: NotificationData::from_query(raw, context),
            verification_url: None,
        }
    }

    /// Overrides the verification endpoint (for testing).
    pub fn with_verification_url(mut self, url: impl Into<String>) -> Self {
        self.verification_url = Some(url.into());
        self
    }

    fn verification_url(&self) -> &str {
        if let Some(url) = &self.verification_url {
            return url;
        }
        match self.data.context.mode {
            IntegrationMode::Production => PRODUCTION_URL,
            _ => TEST_URL,
        }
    }
}

#[async_trait]
impl PaymentNotification for PaypalNotification {
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
        match self.params().get("payment_status") {
            Some("Completed") => PaymentStatus::Completed,
            Some("Pending") => PaymentStatus::Pending,
            Some("Failed") | Some("Denied") | Some("Expired") => PaymentStatus::Failed,
            Some("Voided") => PaymentStatus::Cancelled,
            Some("Reversed") | Some("Refunded") => PaymentStatus::Reversed,
            Some(other) => PaymentStatus::Unknown(other.to_string()),
            None => PaymentStatus::Unknown(String::new()),
        }
    }

    fn gross(&self) -> Option<String> {
        self.params().get("mc_gross").map(str::to_string)
    }

    fn currency(&self) -> Option<String> {
        self.params().get("mc_currency").map(str::to_string)
    }

    fn transaction_id(&self) -> Option<String> {
        self.params().get("txn_id").map(str::to_string)
    }

    fn item_id(&self) -> Option<String> {
        self.params()
            .get("invoice")
            .or_else(|| self.params().get("item_number"))
            .map(str::to_string)
    }

    fn received_at(&self) -> Option<DateTime<Utc>> {
        // "18:30:30 Jan 01, 2026 PST"; the trailing zone abbreviation is
        // not machine-resolvable, so the timestamp is taken as UTC
        let raw = self.params().get("payment_date")?;
        let without_zone = raw.rsplit_once(' ').map(|(head, _)| head).unwrap_or(raw);
        NaiveDateTime::parse_from_str(without_zone, "%H:%M:%S %b %d, %Y")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn test(&self) -> bool {
        self.params().get("test_ipn") == Some("1")
    }

    async fn acknowledge(&self) -> bool {
        if self.raw().is_empty() {
            return false;
        }
        let body = format!("{}&cmd=_notify-validate", self.raw());
        let client = match reqwest::Client::builder()
            .timeout(self.data.context.timeout)
            .build()
        {
            Ok(client) => client,
            Err(error) => {
                tracing::warn!(%error, "failed to build verification client");
                return false;
            }
        };

        let response = client
            .post(self.verification_url())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) => match response.text().await {
                Ok(text) => text == "VERIFIED",
                Err(error) => {
                    tracing::warn!(%error, "failed to read verification response");
                    false
                }
            },
            Err(error) => {
                tracing::warn!(%error, "IPN verification round-trip failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAMPLE_IPN: &str = "payment_status=Completed&mc_gross=500.00&mc_currency=USD\
&txn_id=61E67681CH3238416&invoice=123&test_ipn=1\
&payment_date=18%3A30%3A30+Jan+05%2C+2026+PST";

    fn notification(raw: &str) -> PaypalNotification {
        PaypalNotification::parse(raw, VerificationContext::default())
    }

    #[test]
    fn test_accessors() {
        let n = notification(SAMPLE_IPN);
        assert_eq!(n.status(), PaymentStatus::Completed);
        assert!(n.complete());
        assert_eq!(n.gross().as_deref(), Some("500.00"));
        assert_eq!(n.gross_cents(), Some(50000));
        assert_eq!(n.currency().as_deref(), Some("USD"));
        assert_eq!(n.transaction_id().as_deref(), Some("61E67681CH3238416"));
        assert_eq!(n.item_id().as_deref(), Some("123"));
        assert!(n.test());
    }

    #[test]
    fn test_status_vocabulary() {
        assert_eq!(notification("payment_status=Pending").status(), PaymentStatus::Pending);
        assert_eq!(notification("payment_status=Denied").status(), PaymentStatus::Failed);
        assert_eq!(notification("payment_status=Reversed").status(), PaymentStatus::Reversed);
        assert_eq!(
            notification("payment_status=In-Progress").status(),
            PaymentStatus::Unknown("In-Progress".to_string())
        );
    }

    #[test]
    fn test_received_at_parses_paypal_format() {
        let n = notification(SAMPLE_IPN);
        let at = n.received_at().unwrap();
        assert_eq!(at.hour(), 18);
        assert_eq!(at.minute(), 30);
    }

    #[test]
    fn test_empty_payload_is_total() {
        let n = notification("");
        assert_eq!(n.status(), PaymentStatus::Unknown(String::new()));
        assert_eq!(n.gross(), None);
        assert_eq!(n.received_at(), None);
    }

    #[tokio::test]
    async fn test_acknowledge_rejects_empty_payload_without_io() {
        // An empty payload fails before any round-trip is attempted
        assert!(!notification("").acknowledge().await);
    }

    #[tokio::test]
    async fn test_acknowledge_fails_closed_on_network_error() {
        // Port 9 (discard) refuses the connection; the error must fold
        // into `false`, never propagate
        let n = notification(SAMPLE_IPN).with_verification_url("http://127.0.0.1:9/webscr");
        assert!(!n.acknowledge().await);
    }

    #[test]
    fn test_helper_builds_expected_fields() {
        let options = HelperOptions {
            amount: Some("500".to_string()),
            currency: Some("USD".to_string()),
            ..Default::default()
        };
        let mut helper = Paypal
            .helper("123", "merchant@example.com", options, IntegrationMode::Production)
            .unwrap();
        helper.billing_address([("country", "CA"), ("city", "Ottawa")]);
        let fields = helper.form_fields();
        assert_eq!(fields.get("cmd").map(String::as_str), Some("_xclick"));
        assert_eq!(fields.get("invoice").map(String::as_str), Some("123"));
        assert_eq!(
            fields.get("business").map(String::as_str),
            Some("merchant@example.com")
        );
        assert_eq!(fields.get("amount").map(String::as_str), Some("500"));
        assert_eq!(fields.get("country").map(String::as_str), Some("CA"));
        assert_eq!(fields.get("city").map(String::as_str), Some("Ottawa"));
    }

    #[test]
    fn test_service_urls() {
        assert_eq!(
            Paypal.service_url(IntegrationMode::Production).unwrap(),
            PRODUCTION_URL
        );
        assert_eq!(Paypal.service_url(IntegrationMode::Test).unwrap(), TEST_URL);
        assert!(matches!(
            Paypal.service_url(IntegrationMode::Simulate),
            Err(OffsiteError::UnsupportedMode { gateway: "paypal", .. })
        ));
    }
}
