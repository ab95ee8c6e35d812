//! PayU India (web checkout).
//!
//! Both directions are authenticated with SHA-512 checksums over
//! pipe-joined fixed positions. Outbound the salt trails the fields:
//!
//! ```text
//! key|txnid|amount|productinfo|firstname|email|udf1..udf10|SALT
//! ```
//!
//! Inbound the gateway signs the same positions in reverse with the salt
//! leading, so the two recipes are distinct [`SigningSpec`]s interpreted
//! by the same engine. Empty udf slots still occupy their positions.

use async_trait::async_trait;

use crate::errors::{OffsiteError, Result};
use crate::gateways::{Integration, IntegrationMode};
use crate::helper::{Helper, HelperOptions};
use crate::mapping::{FieldMapping, FieldTarget};
use crate::notification::{
    NotificationData, Params, PaymentNotification, PaymentStatus, VerificationContext,
};
use crate::returns::{PaymentReturn, Return};
use crate::signing::{SecretPlacement, SignatureAlgorithm, SigningSpec};

const PRODUCTION_URL: &str = "https://secure.payu.in/_payment";
const TEST_URL: &str = "https://test.payu.in/_payment";

const REQUEST_FIELDS: [&str; 16] = [
    "key", "txnid", "amount", "productinfo", "firstname", "email", "udf1", "udf2", "udf3",
    "udf4", "udf5", "udf6", "udf7", "udf8", "udf9", "udf10",
];

const RESPONSE_FIELDS: [&str; 17] = [
    "status", "udf10", "udf9", "udf8", "udf7", "udf6", "udf5", "udf4", "udf3", "udf2", "udf1",
    "email", "firstname", "productinfo", "amount", "txnid", "key",
];

static MAPPING: FieldMapping = FieldMapping::new(&[
    ("order", FieldTarget::Single("txnid")),
    ("account", FieldTarget::Single("key")),
    ("amount", FieldTarget::Single("amount")),
    ("description", FieldTarget::Single("productinfo")),
    ("return_url", FieldTarget::Broadcast(&["surl", "furl"])),
    ("notify_url", FieldTarget::Single("curl")),
    (
        "customer",
        FieldTarget::Composite(&[
            ("first_name", "firstname"),
            ("last_name", "lastname"),
            ("email", "email"),
            ("phone", "phone"),
        ]),
    ),
    (
        "billing_address",
        FieldTarget::Composite(&[
            ("address1", "address1"),
            ("address2", "address2"),
            ("city", "city"),
            ("state", "state"),
            ("zip", "zipcode"),
            ("country", "country"),
        ]),
    ),
]);

fn request_spec(salt: &str) -> SigningSpec {
    SigningSpec::new(
        SignatureAlgorithm::Sha512,
        &REQUEST_FIELDS,
        salt,
        SecretPlacement::Suffix,
        "|",
        "hash",
    )
}

fn response_spec(salt: &str) -> SigningSpec {
    SigningSpec::new(
        SignatureAlgorithm::Sha512,
        &RESPONSE_FIELDS,
        salt,
        SecretPlacement::Prefix,
        "|",
        "hash",
    )
}

/// The PayU India integration.
pub struct Payu;

impl Integration for Payu {
    fn id(&self) -> &'static str {
        "payu"
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
        // The checksum salt is mandatory: PayU rejects unsigned requests
        let salt = options
            .credential2
            .clone()
            .ok_or(OffsiteError::MissingCredential("credential2 (checksum salt)"))?;
        let helper = Helper::new(order, account, &MAPPING, options, mode)
            .with_signer(request_spec(&salt));
        Ok(helper)
    }

    fn notification(
        &self,
        raw: &str,
        context: VerificationContext,
    ) -> Result<Box<dyn PaymentNotification>> {
        Ok(Box::new(PayuNotification::parse(raw, context)))
    }

    fn returning(
        &self,
        query_string: &str,
        _context: VerificationContext,
    ) -> Result<Box<dyn PaymentReturn>> {
        Ok(Box::new(PayuReturn::parse(query_string)))
    }
}

/// One parsed PayU callback.
#[derive(Debug, Clone)]
pub struct PayuNotification {
    data: NotificationData,
}

impl PayuNotification {
    /// Parses a raw callback POST body.
    pub fn parse(raw: &str, context: VerificationContext) -> Self {
        Self {
            data: NotificationData::from_query(raw, context),
        }
    }
}

#[async_trait]
impl PaymentNotification for PayuNotification {
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
        match self.params().get("status") {
            Some("success") => PaymentStatus::Completed,
            Some("pending") => PaymentStatus::Pending,
            Some("failure") => PaymentStatus::Failed,
            Some(other) => PaymentStatus::Unknown(other.to_string()),
            None => PaymentStatus::Unknown(String::new()),
        }
    }

    fn gross(&self) -> Option<String> {
        self.params().get("amount").map(str::to_string)
    }

    fn currency(&self) -> Option<String> {
        // PayU India settles in INR only
        Some("INR".to_string())
    }

    fn transaction_id(&self) -> Option<String> {
        self.params().get("mihpayid").map(str::to_string)
    }

    fn item_id(&self) -> Option<String> {
        self.params().get("txnid").map(str::to_string)
    }

    async fn acknowledge(&self) -> bool {
        let Some(salt) = self.data.context.secret.as_deref() else {
            tracing::warn!("no checksum salt configured, cannot verify");
            return false;
        };
        let Some(presented) = self.params().get("hash") else {
            return false;
        };
        response_spec(salt).verify(&self.params().lookup(), presented)
    }
}

/// One parsed PayU return redirect.
///
/// PayU multiplexes success and failure onto the same return URL, so the
/// base success-by-default does not apply.
#[derive(Debug, Clone)]
pub struct PayuReturn {
    inner: Return,
}

impl PayuReturn {
    /// Parses a return query string.
    pub fn parse(query_string: &str) -> Self {
        Self {
            inner: Return::parse(query_string),
        }
    }
}

impl PaymentReturn for PayuReturn {
    fn inner(&self) -> &Return {
        &self.inner
    }

    fn success(&self) -> bool {
        self.inner.params().get("status") == Some("success")
    }

    fn message(&self) -> String {
        self.inner
            .params()
            .get("error_Message")
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &str = "test-salt";

    fn signed_callback(status: &str, amount: &str) -> String {
        let pairs = [
            ("key", "merchant-key"),
            ("txnid", "order-77"),
            ("amount", amount),
            ("productinfo", "Widget"),
            ("firstname", "Ada"),
            ("email", "ada@example.com"),
            ("status", status),
            ("mihpayid", "403993715521"),
        ];
        let params = Params::from_pairs(pairs);
        let hash = response_spec(SALT).compute(&params.lookup());
        let mut body: String = pairs
            .iter()
            .map(|(k, v)| format!("{}={}&", k, urlencode(v)))
            .collect();
        body.push_str(&format!("hash={}", hash));
        body
    }

    fn urlencode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    fn notification(raw: &str) -> PayuNotification {
        PayuNotification::parse(
            raw,
            VerificationContext::default().with_secret(SALT),
        )
    }

    #[tokio::test]
    async fn test_acknowledge_round_trip() {
        let n = notification(&signed_callback("success", "500.00"));
        assert_eq!(n.status(), PaymentStatus::Completed);
        assert!(n.complete());
        assert!(n.acknowledge().await);
        assert_eq!(n.gross_cents(), Some(50000));
        assert_eq!(n.currency().as_deref(), Some("INR"));
        assert_eq!(n.transaction_id().as_deref(), Some("403993715521"));
        assert_eq!(n.item_id().as_deref(), Some("order-77"));
    }

    #[tokio::test]
    async fn test_acknowledge_detects_tampered_amount() {
        // Sign at 500.00, then corrupt the amount: the stated status stays
        // "success" but verification must fail
        let tampered = signed_callback("success", "500.00").replace("amount=500.00", "amount=5000.00");
        let n = notification(&tampered);
        assert!(n.complete());
        assert!(!n.acknowledge().await);
    }

    #[tokio::test]
    async fn test_acknowledge_without_salt_fails_closed() {
        let raw = signed_callback("success", "500.00");
        let n = PayuNotification::parse(&raw, VerificationContext::default());
        assert!(!n.acknowledge().await);
    }

    #[test]
    fn test_status_vocabulary() {
        assert_eq!(notification("status=pending").status(), PaymentStatus::Pending);
        assert_eq!(notification("status=failure").status(), PaymentStatus::Failed);
        assert_eq!(
            notification("status=dropped").status(),
            PaymentStatus::Unknown("dropped".to_string())
        );
    }

    #[test]
    fn test_helper_requires_salt() {
        let err = Payu
            .helper("1", "k", HelperOptions::default(), IntegrationMode::Test)
            .unwrap_err();
        assert!(matches!(err, OffsiteError::MissingCredential(_)));
    }

    #[test]
    fn test_helper_request_hash_holds_empty_positions() {
        let options = HelperOptions {
            amount: Some("500.00".to_string()),
            description: Some("Widget".to_string()),
            credential2: Some(SALT.to_string()),
            ..Default::default()
        };
        let mut helper = Payu
            .helper("order-77", "merchant-key", options, IntegrationMode::Production)
            .unwrap();
        helper.add_fields(
            "customer",
            [("first_name", "Ada"), ("email", "ada@example.com")],
        );

        let fields = helper.form_fields().clone();
        let expected_canonical = format!(
            "merchant-key|order-77|500.00|Widget|Ada|ada@example.com|||||||||||{}",
            SALT
        );
        let spec = request_spec(SALT);
        assert_eq!(
            spec.canonical_string(&|name| fields.get(name).cloned()),
            expected_canonical
        );
        assert_eq!(
            fields.get("hash").map(String::as_str),
            Some(spec.compute(&|name| fields.get(name).cloned()).as_str())
        );
        // Return URL broadcast to surl and furl
        let mut helper = Payu
            .helper(
                "1",
                "k",
                HelperOptions {
                    credential2: Some(SALT.to_string()),
                    return_url: Some("https://example.com/done".to_string()),
                    ..Default::default()
                },
                IntegrationMode::Test,
            )
            .unwrap();
        let fields = helper.form_fields();
        assert_eq!(
            fields.get("surl").map(String::as_str),
            Some("https://example.com/done")
        );
        assert_eq!(fields.get("surl"), fields.get("furl"));
    }

    #[test]
    fn test_return_multiplexes_success_and_failure() {
        let r = PayuReturn::parse("status=success&txnid=1");
        assert!(r.success());
        let r = PayuReturn::parse("status=failure&error_Message=Declined");
        assert!(!r.success());
        assert_eq!(r.message(), "Declined");
    }
}
