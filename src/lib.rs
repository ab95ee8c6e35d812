//! # offsite-payments-rs
//!
//! Adapters for redirect-based hosted payment gateways: build the hidden
//! form fields that send a payer to a gateway's hosted page, then parse
//! and verify what the gateway sends back — asynchronous webhooks/IPNs and
//! synchronous return-URL redirects.
//!
//! ## Features
//!
//! - **Helpers**: outgoing form builders driven by declarative per-gateway
//!   field mappings (scalar, broadcast, and composite address/customer
//!   mappings), with lazy signature computation
//! - **Notifications**: webhook/IPN parsing (form-urlencoded, JSON, XML)
//!   with a fail-closed `acknowledge` verification gate — local hash/HMAC
//!   recomputation or a server round-trip to the gateway
//! - **Returns**: return-URL parsing, treated as a UX hint only
//! - **Registry**: gateways composed behind one `Integration` trait and
//!   looked up by id
//! - **Extensible**: a new gateway is a field mapping, a signing recipe,
//!   and a status vocabulary
//!
//! ## Quick Start
//!
//! ### Building a redirect form
//!
//! ```rust
//! use offsite_payments_rs::gateways::{lookup, IntegrationMode};
//! use offsite_payments_rs::helper::HelperOptions;
//!
//! # fn example() -> offsite_payments_rs::Result<()> {
//! let gateway = lookup("paypal")?;
//! let options = HelperOptions {
//!     amount: Some("5.00".to_string()),
//!     currency: Some("USD".to_string()),
//!     ..Default::default()
//! };
//! let mut helper = gateway.helper("order-1", "merchant@example.com", options, IntegrationMode::Test)?;
//! helper.billing_address([("country", "Canada"), ("city", "Ottawa")]);
//!
//! let action = gateway.service_url(IntegrationMode::Test)?;
//! for (name, value) in helper.form_fields() {
//!     // render <input type="hidden" name=... value=...> under a form
//!     // posting to `action`
//!     let _ = (name, value, action);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Verifying a webhook
//!
//! ```rust,no_run
//! use offsite_payments_rs::gateways::{lookup, IntegrationMode};
//! use offsite_payments_rs::notification::VerificationContext;
//!
//! # async fn example(raw_body: &str) -> offsite_payments_rs::Result<()> {
//! let gateway = lookup("payu")?;
//! let context = VerificationContext::new(IntegrationMode::Production)
//!     .with_secret("checksum-salt");
//! let notification = gateway.notification(raw_body, context)?;
//!
//! if notification.acknowledge().await && notification.complete() {
//!     // fulfill the order; deduplicate by notification.transaction_id()
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Trust model
//!
//! `complete` repeats what the gateway *states*; `acknowledge` *verifies*
//! the payload cryptographically or via the gateway's verification
//! endpoint, and fails closed on any mismatch, parse error, or network
//! failure. Return-URL redirects are user-controlled and carry no
//! verification in the base case — never fulfill from a `Return` alone.
//!
//! One logical transaction spans one `Helper` (outbound) and typically one
//! `Notification` and/or `Return` (inbound), correlated by order and
//! transaction ids. Correlation — and idempotent webhook processing — is
//! the caller's responsibility.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod country;
pub mod errors;
pub mod gateways;
pub mod helper;
pub mod mapping;
pub mod notification;
pub mod returns;
pub mod signing;

// Re-export commonly used items
pub use errors::{OffsiteError, Result};
pub use gateways::{lookup, registry, Integration, IntegrationMode};
pub use helper::{Helper, HelperOptions};
pub use notification::{
    Params, PaymentNotification, PaymentStatus, VerificationContext,
};
pub use returns::{DefaultReturn, PaymentReturn, Return};
