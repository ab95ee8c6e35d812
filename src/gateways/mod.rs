//! Gateway integrations.
//!
//! Each gateway wires the three framework pieces together: a field mapping
//! for the outgoing [`Helper`](crate::helper::Helper), a notification type
//! with its verification recipe, and a return type. Gateways are composed
//! behind the [`Integration`] trait and looked up through a static
//! [`registry`] — common shape, different data.
//!
//! The catalog shipped here is illustrative: these four gateways exercise
//! every mechanism the framework exposes (server round-trip acknowledge,
//! local MD5/SHA-512/HMAC verification, lazy helper signatures, broadcast
//! mappings, and JSON payloads).

pub mod dwolla;
pub mod paypal;
pub mod payu;
pub mod worldpay;

use std::fmt;
use std::str::FromStr;

use crate::errors::{OffsiteError, Result};
use crate::helper::{Helper, HelperOptions};
use crate::notification::{PaymentNotification, VerificationContext};
use crate::returns::PaymentReturn;

/// Which environment a gateway should resolve its service URL for.
///
/// Explicit and per-call — there is no process-wide mode. Unknown mode
/// strings fail fast rather than silently defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMode {
    /// Gateway sandbox/test environment
    Test,
    /// Live environment
    Production,
    /// Local simulator, for the few gateways that provide one
    Simulate,
}

impl fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Test => "test",
            Self::Production => "production",
            Self::Simulate => "simulate",
        };
        f.write_str(name)
    }
}

impl FromStr for IntegrationMode {
    type Err = OffsiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            "simulate" => Ok(Self::Simulate),
            other => Err(OffsiteError::UnknownMode(other.to_string())),
        }
    }
}

/// One gateway's composed capabilities: outgoing form building, inbound
/// notification verification, and return parsing.
pub trait Integration: Send + Sync {
    /// Registry identifier, e.g. `"paypal"`.
    fn id(&self) -> &'static str;

    /// The hosted-page URL for the given mode.
    ///
    /// Errors with [`OffsiteError::UnsupportedMode`] when the gateway has
    /// no environment for the mode; never silently defaults.
    fn service_url(&self, mode: IntegrationMode) -> Result<&'static str>;

    /// Builds the outgoing form helper for one transaction.
    fn helper(
        &self,
        order: &str,
        account: &str,
        options: HelperOptions,
        mode: IntegrationMode,
    ) -> Result<Helper>;

    /// Parses an inbound asynchronous notification payload.
    fn notification(
        &self,
        raw: &str,
        context: VerificationContext,
    ) -> Result<Box<dyn PaymentNotification>>;

    /// Parses an inbound synchronous return query string.
    fn returning(
        &self,
        query_string: &str,
        context: VerificationContext,
    ) -> Result<Box<dyn PaymentReturn>>;
}

static REGISTRY: [&dyn Integration; 4] = [
    &paypal::Paypal,
    &worldpay::Worldpay,
    &payu::Payu,
    &dwolla::Dwolla,
];

/// All registered gateways.
pub fn registry() -> &'static [&'static dyn Integration] {
    &REGISTRY
}

/// Looks up a gateway by its registry identifier.
pub fn lookup(id: &str) -> Result<&'static dyn Integration> {
    REGISTRY
        .iter()
        .find(|integration| integration.id() == id)
        .copied()
        .ok_or_else(|| OffsiteError::UnknownGateway(id.to_string()))
}
