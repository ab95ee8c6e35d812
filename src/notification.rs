//! Inbound asynchronous notification (webhook/IPN) handling.
//!
//! A notification is the trust boundary of the whole framework: redirect
//! returns are user-controlled and spoofable, so settlement decisions hang
//! on [`PaymentNotification::acknowledge`] alone. `complete` reports what
//! the gateway *states*; `acknowledge` *verifies* the payload has not been
//! tampered with or spoofed, either by recomputing a local signature or by
//! a server round-trip to the gateway's verification endpoint.
//!
//! Parsing is deliberately forgiving: a malformed or empty payload yields
//! empty params, every accessor returns `None`, and `acknowledge` fails
//! cleanly instead of panicking.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::gateways::IntegrationMode;

/// The key/value store parsed once from a raw notification payload.
///
/// Gateways deliver form-urlencoded bodies by default; JSON and XML bodies
/// are flattened into the same string→string shape so the accessor and
/// signing machinery stays uniform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: BTreeMap<String, String>,
}

impl Params {
    /// Parses a form-urlencoded body or query string.
    ///
    /// Duplicate keys keep the last value. Malformed input degrades to
    /// whatever pairs were parseable, never an error.
    pub fn from_query(raw: &str) -> Self {
        let entries = url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect();
        Self { entries }
    }

    /// Parses a JSON body, flattening nested objects with dotted keys
    /// (`{"amount":{"total":"5"}}` → `amount.total = 5`). Arrays flatten
    /// by index. A non-object or unparseable body yields empty params.
    pub fn from_json(raw: &str) -> Self {
        let mut entries = BTreeMap::new();
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            flatten_json("", &value, &mut entries);
        }
        Self { entries }
    }

    /// Parses an XML body. The root element's children flatten into
    /// dotted keys the same way JSON does; element text attached to an
    /// attributed element (`$text`) collapses onto the element's key.
    /// Unparseable input yields empty params.
    pub fn from_xml(raw: &str) -> Self {
        let mut entries = BTreeMap::new();
        if let Ok(value) = quick_xml::de::from_str::<Value>(raw) {
            flatten_json("", &value, &mut entries);
        }
        Self { entries }
    }

    /// Builds params directly from pairs; used by gateway tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Reads one parsed value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether anything was parsed at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates parsed pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A lookup closure over these params, in the shape the
    /// [signing engine](crate::signing::SigningSpec) consumes.
    pub fn lookup(&self) -> impl Fn(&str) -> Option<String> + '_ {
        move |name| self.entries.get(name).cloned()
    }
}

fn flatten_json(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                // quick-xml parks element text under "$text" when the
                // element also carries attributes; collapse it onto the
                // element's own key
                let key = if key == "$text" {
                    prefix.to_string()
                } else if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_json(&key, value, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_json(&format!("{}.{}", prefix, index), item, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Null => {}
    }
}

/// Per-call verification context for inbound payloads.
///
/// Replaces ambient process-wide configuration: the integration mode,
/// credential material, and network policy travel with each notification.
#[derive(Debug, Clone)]
pub struct VerificationContext {
    /// Integration mode the receiving endpoint runs in
    pub mode: IntegrationMode,
    /// Shared secret / signing salt, when the gateway uses one
    pub secret: Option<String>,
    /// Second credential slot (gateway-specific meaning)
    pub credential2: Option<String>,
    /// Third credential slot
    pub credential3: Option<String>,
    /// Fourth credential slot
    pub credential4: Option<String>,
    /// Source-IP allow-list; empty means no network-layer check
    pub allowed_ips: Vec<IpAddr>,
    /// Timeout applied to verification round-trips
    pub timeout: Duration,
}

impl Default for VerificationContext {
    fn default() -> Self {
        Self {
            mode: IntegrationMode::Production,
            secret: None,
            credential2: None,
            credential3: None,
            credential4: None,
            allowed_ips: Vec::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl VerificationContext {
    /// A context for the given mode with no credentials.
    pub fn new(mode: IntegrationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Sets the shared secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the second credential slot.
    pub fn with_credential2(mut self, value: impl Into<String>) -> Self {
        self.credential2 = Some(value.into());
        self
    }

    /// Sets the third credential slot.
    pub fn with_credential3(mut self, value: impl Into<String>) -> Self {
        self.credential3 = Some(value.into());
        self
    }

    /// Sets the source-IP allow-list.
    pub fn with_allowed_ips(mut self, ips: Vec<IpAddr>) -> Self {
        self.allowed_ips = ips;
        self
    }

    /// Sets the verification round-trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Normalized payment outcome vocabulary.
///
/// The base framework defines only the type; each gateway owns the mapping
/// from its own finite status set, because gateways disagree on semantics
/// (one gateway's "pending" needs manual seller action, another's is purely
/// transient). Unrecognized raw values are preserved in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Payment settled successfully
    Completed,
    /// Payment in flight or awaiting action
    Pending,
    /// Payment failed
    Failed,
    /// Payer cancelled
    Cancelled,
    /// Payment reversed/charged back after settlement
    Reversed,
    /// Raw status the gateway mapping does not recognize
    Unknown(String),
}

/// The raw payload, parsed params, and verification context behind one
/// notification. Gateway notification types embed this.
#[derive(Debug, Clone)]
pub struct NotificationData {
    /// Parsed key/value payload
    pub params: Params,
    /// Original unparsed payload, kept for signature recomputation and
    /// verification round-trips
    pub raw: String,
    /// Per-call verification context
    pub context: VerificationContext,
}

impl NotificationData {
    /// Parses a form-urlencoded payload (the default gateway shape).
    pub fn from_query(raw: impl Into<String>, context: VerificationContext) -> Self {
        let raw = raw.into();
        Self {
            params: Params::from_query(&raw),
            raw,
            context,
        }
    }

    /// Parses a JSON payload.
    pub fn from_json(raw: impl Into<String>, context: VerificationContext) -> Self {
        let raw = raw.into();
        Self {
            params: Params::from_json(&raw),
            raw,
            context,
        }
    }

    /// Parses an XML payload.
    pub fn from_xml(raw: impl Into<String>, context: VerificationContext) -> Self {
        let raw = raw.into();
        Self {
            params: Params::from_xml(&raw),
            raw,
            context,
        }
    }
}

/// One inbound asynchronous payment notification.
///
/// All accessors are pure reads of the parsed params; none mutate state.
/// `acknowledge` is the single authoritative trust gate — `complete` only
/// repeats what the gateway claims.
#[async_trait]
pub trait PaymentNotification: Send + Sync {
    /// The parsed payload.
    fn params(&self) -> &Params;

    /// The original unparsed payload.
    fn raw(&self) -> &str;

    /// The verification context this notification was constructed with.
    fn context(&self) -> &VerificationContext;

    /// Normalized payment status per this gateway's vocabulary.
    fn status(&self) -> PaymentStatus;

    /// Gross amount as a decimal string, as the gateway reported it.
    fn gross(&self) -> Option<String>;

    /// Gateway-side transaction identifier.
    fn transaction_id(&self) -> Option<String>;

    /// Verifies the payload's authenticity. Never errors: any parse or
    /// network failure inside an implementation is a `false` return
    /// (fail closed).
    async fn acknowledge(&self) -> bool;

    /// Whether the gateway *states* the payment completed. This is not
    /// verification; callers must still gate on
    /// [`acknowledge`](PaymentNotification::acknowledge).
    fn complete(&self) -> bool {
        self.status() == PaymentStatus::Completed
    }

    /// Gross amount in minor units (cents), decimal-exact with half-up
    /// rounding at the cent boundary: `"157.005"` → `15701`.
    ///
    /// Gateways that already deliver minor units must override this rather
    /// than rely on the scaling formula.
    fn gross_cents(&self) -> Option<i64> {
        self.gross().and_then(|gross| scale_to_cents(&gross))
    }

    /// The caller's own order/reference id, when the gateway echoes one.
    fn item_id(&self) -> Option<String> {
        None
    }

    /// ISO 4217 currency code, when reported.
    fn currency(&self) -> Option<String> {
        None
    }

    /// When the gateway processed the payment, when reported.
    fn received_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Whether the *payload* declares itself a test transaction. Distinct
    /// from helper-side test mode: a notification may arrive for a
    /// transaction originated in either mode, and the payload is
    /// authoritative.
    fn test(&self) -> bool {
        false
    }

    /// Coarse network-layer check of the sending IP.
    ///
    /// Unconditionally true in test mode or when no allow-list is
    /// configured. Not a substitute for `acknowledge`.
    fn valid_sender(&self, ip: IpAddr) -> bool {
        let context = self.context();
        if context.mode == IntegrationMode::Test || context.allowed_ips.is_empty() {
            return true;
        }
        context.allowed_ips.contains(&ip)
    }
}

/// Scales a decimal amount string to minor units, half-up at the cent
/// boundary, without a binary-float intermediate.
///
/// Returns `None` for non-numeric input.
pub fn scale_to_cents(gross: &str) -> Option<i64> {
    let gross = gross.trim();
    let (negative, digits) = match gross.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, gross),
    };
    if digits.is_empty() {
        return None;
    }

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
        || (whole.is_empty() && fraction.is_empty())
    {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut fraction_digits = fraction.chars();
    let tens = fraction_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let units = fraction_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let round_up = fraction_digits
        .next()
        .and_then(|c| c.to_digit(10))
        .map(|d| d >= 5)
        .unwrap_or(false);

    let mut cents = whole.checked_mul(100)? + tens * 10 + units;
    if round_up {
        cents += 1;
    }
    Some(if negative { -cents } else { cents })
}
