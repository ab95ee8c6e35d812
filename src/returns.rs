//! Inbound synchronous return-URL handling.
//!
//! A [`Return`] parses the query string of the browser redirect a gateway
//! sends the payer back with. Returns carry no verification in the base
//! case and are user-controlled, so they are a UX hint only: the framework
//! invariant is that settlement trust comes exclusively from the
//! asynchronous [`Notification`](crate::notification) path and its
//! `acknowledge` gate.

use crate::notification::Params;

/// One parsed return-URL redirect.
#[derive(Debug, Clone)]
pub struct Return {
    params: Params,
}

impl Return {
    /// Parses a return query string.
    pub fn parse(query_string: &str) -> Self {
        Self {
            params: Params::from_query(query_string),
        }
    }

    /// The parsed query parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Gateway-facing view of a return redirect.
///
/// Most gateways only invoke the return URL on success by construction of
/// the redirect flow, so the base defaults assume success; gateways that
/// multiplex success/failure/cancel into one return URL override.
pub trait PaymentReturn {
    /// The underlying parsed return.
    fn inner(&self) -> &Return;

    /// Whether the redirect indicates success. Default: `true`.
    fn success(&self) -> bool {
        true
    }

    /// Whether the payer cancelled. Default: `false`.
    fn cancelled(&self) -> bool {
        false
    }

    /// Gateway-supplied message for display, if any. Default: empty.
    fn message(&self) -> String {
        String::new()
    }
}

/// The base return type used by gateways without return-specific behavior.
#[derive(Debug, Clone)]
pub struct DefaultReturn {
    inner: Return,
}

impl DefaultReturn {
    /// Parses a query string into a default (success-assumed) return.
    pub fn parse(query_string: &str) -> Self {
        Self {
            inner: Return::parse(query_string),
        }
    }
}

impl PaymentReturn for DefaultReturn {
    fn inner(&self) -> &Return {
        &self.inner
    }
}
