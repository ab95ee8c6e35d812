//! WorldPay Business Gateway (select junior / HTML redirect).
//!
//! Outbound: the helper carries an MD5 signature over
//! `secret:amount:currency:cartId`, computed lazily when the form fields
//! are first read so late setter calls still land inside the signed set.
//! The order id is broadcast to both `cartId` and `MC_orderId` (the `MC_`
//! copy is echoed back verbatim in the callback).
//!
//! Inbound: WorldPay authenticates its callback with a shared callback
//! password carried in the `callbackPW` field. No password in the
//! verification context means no way to verify, which is a failed
//! acknowledge — never a pass-through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

use crate::errors::{OffsiteError, Result};
use crate::gateways::{Integration, IntegrationMode};
use crate::helper::{Helper, HelperOptions};
use crate::mapping::{FieldMapping, FieldTarget};
use crate::notification::{
    NotificationData, Params, PaymentNotification, PaymentStatus, VerificationContext,
};
use crate::returns::{DefaultReturn, PaymentReturn};
use crate::signing::{SecretPlacement, SignatureAlgorithm, SigningSpec};

const PRODUCTION_URL: &str = "https://secure.worldpay.com/wcc/purchase";
const TEST_URL: &str = "https://secure-test.worldpay.com/wcc/purchase";

static MAPPING: FieldMapping = FieldMapping::new(&[
    ("order", FieldTarget::Broadcast(&["cartId", "MC_orderId"])),
    ("account", FieldTarget::Single("instId")),
    ("amount", FieldTarget::Single("amount")),
    ("currency", FieldTarget::Single("currency")),
    ("description", FieldTarget::Single("desc")),
    ("notify_url", FieldTarget::Single("MC_callback")),
    ("return_url", FieldTarget::Single("MC_return")),
    (
        "customer",
        FieldTarget::Composite(&[("email", "email"), ("phone", "tel")]),
    ),
    (
        "billing_address",
        FieldTarget::Composite(&[
            ("address1", "address1"),
            ("address2", "address2"),
            ("city", "town"),
            ("state", "region"),
            ("zip", "postcode"),
            ("country", "country"),
        ]),
    ),
]);

/// The WorldPay integration.
pub struct Worldpay;

impl Integration for Worldpay {
    fn id(&self) -> &'static str {
        "worldpay"
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
        // credential2 is the MD5 signature secret; without it WorldPay
        // accepts unsigned forms, so the signer is optional
        let secret = options.credential2.clone();
        let mut helper = Helper::new(order, account, &MAPPING, options, mode);
        helper.add_field("testMode", if helper.test() { "100" } else { "0" });
        if let Some(secret) = secret {
            helper = helper.with_signer(SigningSpec::new(
                SignatureAlgorithm::Md5,
                &["amount", "currency", "cartId"],
                secret,
                SecretPlacement::Prefix,
                ":",
                "signature",
            ));
        }
        Ok(helper)
    }

    fn notification(
        &self,
        raw: &str,
        context: VerificationContext,
    ) -> Result<Box<dyn PaymentNotification>> {
        Ok(Box::new(WorldpayNotification::parse(raw, context)))
    }

    fn returning(
        &self,
        query_string: &str,
        _context: VerificationContext,
    ) -> Result<Box<dyn PaymentReturn>> {
        Ok(Box::new(DefaultReturn::parse(query_string)))
    }
}

/// One parsed WorldPay callback.
#[derive(Debug, Clone)]
pub struct WorldpayNotification {
    data: NotificationData,
}

impl WorldpayNotification {
    /// Parses a raw callback POST body.
    pub fn parse(raw: &str, context: VerificationContext) -> Self {
        Self {
            data: NotificationData::from_query(raw, context),
        }
    }
}

#[async_trait]
impl PaymentNotification for WorldpayNotification {
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
        match self.params().get("transStatus") {
            Some("Y") => PaymentStatus::Completed,
            Some("C") => PaymentStatus::Cancelled,
            Some(other) => PaymentStatus::Unknown(other.to_string()),
            None => PaymentStatus::Unknown(String::new()),
        }
    }

    fn gross(&self) -> Option<String> {
        self.params().get("authAmount").map(str::to_string)
    }

    fn currency(&self) -> Option<String> {
        self.params().get("authCurrency").map(str::to_string)
    }

    fn transaction_id(&self) -> Option<String> {
        self.params().get("transId").map(str::to_string)
    }

    fn item_id(&self) -> Option<String> {
        self.params().get("cartId").map(str::to_string)
    }

    fn received_at(&self) -> Option<DateTime<Utc>> {
        // transTime is epoch milliseconds
        let millis: i64 = self.params().get("transTime")?.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    fn test(&self) -> bool {
        matches!(self.params().get("testMode"), Some(mode) if mode != "0")
    }

    async fn acknowledge(&self) -> bool {
        let Some(secret) = self.data.context.secret.as_deref() else {
            tracing::warn!("no callback password configured, cannot verify");
            return false;
        };
        let Some(presented) = self.params().get("callbackPW") else {
            return false;
        };
        if secret.len() != presented.len() {
            return false;
        }
        secret.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CALLBACK: &str = "transStatus=Y&authAmount=10.00&authCurrency=GBP\
&transId=1234567&cartId=99&callbackPW=pw123&transTime=1767225600000&testMode=0";

    fn notification(raw: &str, secret: Option<&str>) -> WorldpayNotification {
        let mut context = VerificationContext::default();
        context.secret = secret.map(str::to_string);
        WorldpayNotification::parse(raw, context)
    }

    #[test]
    fn test_accessors() {
        let n = notification(SAMPLE_CALLBACK, Some("pw123"));
        assert_eq!(n.status(), PaymentStatus::Completed);
        assert_eq!(n.gross().as_deref(), Some("10.00"));
        assert_eq!(n.gross_cents(), Some(1000));
        assert_eq!(n.currency().as_deref(), Some("GBP"));
        assert_eq!(n.transaction_id().as_deref(), Some("1234567"));
        assert_eq!(n.item_id().as_deref(), Some("99"));
        assert!(!n.test());
        assert!(n.received_at().is_some());
    }

    #[test]
    fn test_cancelled_status() {
        let n = notification("transStatus=C", None);
        assert_eq!(n.status(), PaymentStatus::Cancelled);
        assert!(!n.complete());
    }

    #[tokio::test]
    async fn test_acknowledge_checks_callback_password() {
        assert!(notification(SAMPLE_CALLBACK, Some("pw123")).acknowledge().await);
        assert!(!notification(SAMPLE_CALLBACK, Some("wrong")).acknowledge().await);
        // No configured password fails closed
        assert!(!notification(SAMPLE_CALLBACK, None).acknowledge().await);
        // Completeness is independent of verification
        let n = notification(SAMPLE_CALLBACK, Some("wrong"));
        assert!(n.complete());
        assert!(!n.acknowledge().await);
    }

    #[test]
    fn test_helper_broadcast_and_lazy_signature() {
        let options = HelperOptions {
            amount: Some("10.00".to_string()),
            currency: Some("GBP".to_string()),
            credential2: Some("md5secret".to_string()),
            ..Default::default()
        };
        let mut helper = Worldpay
            .helper("55", "merchant-inst", options, IntegrationMode::Production)
            .unwrap();

        let first = helper.form_fields().clone();
        // Broadcast: one logical order id, two wire fields, same value
        assert_eq!(first.get("cartId").map(String::as_str), Some("55"));
        assert_eq!(first.get("MC_orderId").map(String::as_str), Some("55"));

        // Signature matches an independent recomputation of the recipe
        let expected = SigningSpec::new(
            SignatureAlgorithm::Md5,
            &["amount", "currency", "cartId"],
            "md5secret",
            SecretPlacement::Prefix,
            ":",
            "signature",
        )
        .compute(&|name| first.get(name).cloned());
        assert_eq!(first.get("signature").map(String::as_str), Some(expected.as_str()));

        // Idempotent second read
        assert_eq!(helper.form_fields(), &first);
    }

    #[test]
    fn test_helper_without_secret_is_unsigned() {
        let mut helper = Worldpay
            .helper("55", "inst", HelperOptions::default(), IntegrationMode::Test)
            .unwrap();
        let fields = helper.form_fields();
        assert!(!fields.contains_key("signature"));
        assert_eq!(fields.get("testMode").map(String::as_str), Some("100"));
    }
}
