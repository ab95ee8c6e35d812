//! Declarative field-mapping tables.
//!
//! Every gateway speaks its own wire vocabulary: one calls the order id
//! `cartId`, another `txnid`, a third wants it duplicated into two fields.
//! A [`FieldMapping`] is a static, per-gateway table routing logical
//! attribute names (`"order"`, `"amount"`, `"billing_address"`, ...) to the
//! wire-level field names that gateway expects.
//!
//! Lookups for attributes a gateway does not support return `None`, and the
//! [`Helper`](crate::helper::Helper) treats that as a silent no-op. This is
//! deliberate tolerance, not an error path: it lets one shared calling
//! pattern probe optional capabilities across heterogeneous gateways.

/// Where a logical attribute lands on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// One logical value, one wire field.
    Single(&'static str),

    /// One logical value fanned out to several wire fields, all receiving
    /// the same value.
    Broadcast(&'static [&'static str]),

    /// A composite attribute (billing address, customer) whose sub-keys map
    /// independently: `(sub_key, wire_field)` pairs. Sub-keys supplied by
    /// the caller but absent here are dropped, not errored.
    Composite(&'static [(&'static str, &'static str)]),
}

/// A per-gateway mapping from logical attribute names to wire fields.
///
/// Declared as static data at gateway-definition time:
///
/// ```
/// use offsite_payments_rs::mapping::{FieldMapping, FieldTarget};
///
/// static MAPPING: FieldMapping = FieldMapping::new(&[
///     ("order", FieldTarget::Single("cartId")),
///     ("amount", FieldTarget::Single("amount")),
///     ("billing_address", FieldTarget::Composite(&[
///         ("city", "town"),
///         ("zip", "postcode"),
///         ("country", "country"),
///     ])),
/// ]);
///
/// assert_eq!(MAPPING.target("order"), Some(FieldTarget::Single("cartId")));
/// assert_eq!(MAPPING.target("phone"), None);
/// ```
#[derive(Debug)]
pub struct FieldMapping {
    entries: &'static [(&'static str, FieldTarget)],
}

impl FieldMapping {
    /// Creates a mapping from a static table of entries.
    pub const fn new(entries: &'static [(&'static str, FieldTarget)]) -> Self {
        Self { entries }
    }

    /// An empty mapping; every lookup is `None`.
    pub const fn empty() -> Self {
        Self { entries: &[] }
    }

    /// Looks up the wire target for a logical attribute.
    ///
    /// Returns `None` for unmapped attributes; callers must treat that as
    /// "this gateway does not carry the attribute", never as a failure.
    pub fn target(&self, attribute: &str) -> Option<FieldTarget> {
        self.entries
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, target)| *target)
    }

    /// Looks up the wire field for one sub-key of a composite attribute.
    pub fn composite_target(&self, attribute: &str, sub_key: &str) -> Option<&'static str> {
        match self.target(attribute)? {
            FieldTarget::Composite(pairs) => pairs
                .iter()
                .find(|(key, _)| *key == sub_key)
                .map(|(_, field)| *field),
            _ => None,
        }
    }
}
