//! The outgoing form builder shared by every gateway.
//!
//! A [`Helper`] accumulates the hidden-input fields for one redirect to a
//! hosted payment page. Field names are gateway-specific; the helper routes
//! logical attributes through the gateway's [`FieldMapping`] so integration
//! code stays uniform across gateways. Attributes a gateway does not map are
//! dropped silently; a malformed *option set*, by contrast, is a programmer
//! error and fails construction.

use std::collections::BTreeMap;

use crate::country::{self, CountryFormat};
use crate::errors::{OffsiteError, Result};
use crate::gateways::IntegrationMode;
use crate::mapping::{FieldMapping, FieldTarget};
use crate::signing::SigningSpec;

/// The fixed option set a [`Helper`] accepts.
///
/// Every field is optional; absent options never materialize as empty wire
/// fields. Which of `credential2`..`credential4` carries which secret is
/// gateway-specific and documented per integration.
///
/// Deserialization rejects unknown keys, so configuration files get the
/// same fail-fast allow-list behavior as
/// [`from_pairs`](HelperOptions::from_pairs).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HelperOptions {
    /// Transaction amount, pre-formatted as the gateway expects it
    pub amount: Option<String>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    /// Force test mode for this transaction regardless of integration mode
    pub test: Option<bool>,
    /// Second credential slot (meaning is gateway-specific)
    pub credential2: Option<String>,
    /// Third credential slot
    pub credential3: Option<String>,
    /// Fourth credential slot
    pub credential4: Option<String>,
    /// Merchant country
    pub country: Option<String>,
    /// Display name shown on the hosted page
    pub account_name: Option<String>,
    /// Order description
    pub description: Option<String>,
    /// Gateway-specific transaction type discriminator
    pub transaction_type: Option<String>,
    /// Pre-agreed authorization code
    pub authcode: Option<String>,
    /// Asynchronous notification (webhook/IPN) URL
    pub notify_url: Option<String>,
    /// Synchronous browser-return URL
    pub return_url: Option<String>,
    /// Extra parameter some gateways append to the redirect
    pub redirect_param: Option<String>,
    /// Forwarding URL for gateways that proxy the redirect
    pub forward_url: Option<String>,
}

impl HelperOptions {
    /// Builds options from string pairs, e.g. configuration loaded at runtime.
    ///
    /// Any key outside the fixed allow-list is a caller error and returns
    /// [`OffsiteError::UnknownOption`] immediately — the one strict
    /// validation in the framework, protecting against silent typos in
    /// integration code.
    ///
    /// # Examples
    ///
    /// ```
    /// use offsite_payments_rs::helper::HelperOptions;
    ///
    /// let opts = HelperOptions::from_pairs([
    ///     ("amount", "5.00"),
    ///     ("currency", "USD"),
    /// ]).unwrap();
    /// assert_eq!(opts.amount.as_deref(), Some("5.00"));
    ///
    /// assert!(HelperOptions::from_pairs([("bogus_option", "x")]).is_err());
    /// ```
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let value = value.to_string();
            match key {
                "amount" => options.amount = Some(value),
                "currency" => options.currency = Some(value),
                "test" => {
                    options.test = Some(matches!(value.as_str(), "true" | "1" | "yes"));
                }
                "credential2" => options.credential2 = Some(value),
                "credential3" => options.credential3 = Some(value),
                "credential4" => options.credential4 = Some(value),
                "country" => options.country = Some(value),
                "account_name" => options.account_name = Some(value),
                "description" => options.description = Some(value),
                "transaction_type" => options.transaction_type = Some(value),
                "authcode" => options.authcode = Some(value),
                "notify_url" => options.notify_url = Some(value),
                "return_url" => options.return_url = Some(value),
                "redirect_param" => options.redirect_param = Some(value),
                "forward_url" => options.forward_url = Some(value),
                other => return Err(OffsiteError::UnknownOption(other.to_string())),
            }
        }
        Ok(options)
    }
}

/// Builds the hidden-input field set for one outgoing redirect.
///
/// Constructed once per transaction; `order` and `account` are immutable
/// identity, remaining fields accumulate through mapped setters. The caller
/// reads [`form_fields`](Helper::form_fields) and
/// [`raw_html_fields`](Helper::raw_html_fields) when rendering the form.
#[derive(Debug)]
pub struct Helper {
    mapping: &'static FieldMapping,
    fields: BTreeMap<String, String>,
    raw_html_fields: Vec<(String, String)>,
    order: String,
    account: String,
    test: bool,
    country_format: CountryFormat,
    credential2: Option<String>,
    credential3: Option<String>,
    credential4: Option<String>,
    signer: Option<SigningSpec>,
    signature_applied: bool,
}

impl Helper {
    /// Creates a helper for one transaction.
    ///
    /// `order` and `account` are routed through the mapping like any other
    /// attribute; optional fields are set only when present in `options`.
    /// Test mode is resolved here, once: it is on when the integration mode
    /// is [`IntegrationMode::Test`] or the per-call `test` option is set.
    pub fn new(
        order: impl Into<String>,
        account: impl Into<String>,
        mapping: &'static FieldMapping,
        options: HelperOptions,
        mode: IntegrationMode,
    ) -> Self {
        let order = order.into();
        let account = account.into();
        let mut helper = Self {
            mapping,
            fields: BTreeMap::new(),
            raw_html_fields: Vec::new(),
            order: order.clone(),
            account: account.clone(),
            test: mode == IntegrationMode::Test || options.test.unwrap_or(false),
            country_format: CountryFormat::Alpha2,
            credential2: options.credential2.clone(),
            credential3: options.credential3.clone(),
            credential4: options.credential4.clone(),
            signer: None,
            signature_applied: false,
        };

        helper.set("order", &order);
        helper.set("account", &account);

        let scalar_options = [
            ("amount", &options.amount),
            ("currency", &options.currency),
            ("credential2", &options.credential2),
            ("credential3", &options.credential3),
            ("credential4", &options.credential4),
            ("country", &options.country),
            ("account_name", &options.account_name),
            ("description", &options.description),
            ("transaction_type", &options.transaction_type),
            ("authcode", &options.authcode),
            ("notify_url", &options.notify_url),
            ("return_url", &options.return_url),
            ("redirect_param", &options.redirect_param),
            ("forward_url", &options.forward_url),
        ];
        for (attribute, value) in scalar_options {
            if let Some(value) = value {
                helper.set(attribute, value);
            }
        }

        helper
    }

    /// Overrides the country code format (alpha-2 is the default).
    pub fn with_country_format(mut self, format: CountryFormat) -> Self {
        self.country_format = format;
        self
    }

    /// Attaches a signing spec whose signature is computed lazily on the
    /// first [`form_fields`](Helper::form_fields) read.
    pub fn with_signer(mut self, spec: SigningSpec) -> Self {
        self.signer = Some(spec);
        self
    }

    /// The single generic setter behind every mapped attribute.
    ///
    /// Unmapped attributes are a no-op; a `Single` target writes one field,
    /// a `Broadcast` target writes the same value to every listed field.
    /// Composite attributes go through [`add_fields`](Helper::add_fields).
    pub fn set(&mut self, attribute: &str, value: &str) {
        match self.mapping.target(attribute) {
            Some(FieldTarget::Single(name)) => self.add_field(name, value),
            Some(FieldTarget::Broadcast(names)) => {
                for name in names {
                    self.add_field(name, value);
                }
            }
            Some(FieldTarget::Composite(_)) => {
                tracing::debug!(attribute, "composite attribute set with scalar value, dropped");
            }
            None => {
                tracing::debug!(attribute, "unmapped attribute, dropped");
            }
        }
    }

    /// Stores one wire field. No-op when the name or value is blank; all
    /// values are stored as strings, so numeric formatting happens before
    /// this call.
    pub fn add_field(&mut self, name: &str, value: &str) {
        if name.trim().is_empty() || value.trim().is_empty() {
            return;
        }
        self.fields.insert(name.to_string(), value.to_string());
    }

    /// Appends a field destined for raw (unescaped) HTML rendering.
    ///
    /// Kept as an ordered list rather than a map so duplicate names survive,
    /// which repeated line-item inputs require.
    pub fn add_raw_html_field(&mut self, name: &str, value: &str) {
        if name.trim().is_empty() || value.trim().is_empty() {
            return;
        }
        self.raw_html_fields
            .push((name.to_string(), value.to_string()));
    }

    /// Applies the composite mapping for one attribute to a set of sub-key
    /// pairs. Sub-keys absent from the mapping are dropped.
    pub fn add_fields<'a, I>(&mut self, attribute: &str, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (sub_key, value) in pairs {
            if let Some(name) = self.mapping.composite_target(attribute, sub_key) {
                self.add_field(name, value);
            }
        }
    }

    /// Sets the billing address.
    ///
    /// The `country` sub-key is resolved through the country normalizer to
    /// this helper's configured format; when resolution fails the original
    /// string passes through unchanged (never an error). Remaining sub-keys
    /// follow the composite mapping.
    pub fn billing_address<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.address("billing_address", pairs);
    }

    /// Sets the shipping address; same country handling as
    /// [`billing_address`](Helper::billing_address).
    pub fn shipping_address<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.address("shipping_address", pairs);
    }

    fn address<'a, I>(&mut self, attribute: &str, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (sub_key, value) in pairs {
            let resolved;
            let value = if sub_key == "country" {
                resolved = country::resolve(value, self.country_format)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                resolved.as_str()
            } else {
                value
            };
            if let Some(name) = self.mapping.composite_target(attribute, sub_key) {
                self.add_field(name, value);
            }
        }
    }

    /// The accumulated wire fields.
    ///
    /// Idempotent: when a signer is attached, the signature is computed over
    /// the fields materialized at the first call, cached, and included in
    /// every return thereafter.
    pub fn form_fields(&mut self) -> &BTreeMap<String, String> {
        if let (Some(spec), false) = (&self.signer, self.signature_applied) {
            let fields = self.fields.clone();
            let signature = spec.compute(&|name| fields.get(name).cloned());
            let output_field = spec.output_field.clone();
            self.add_field(&output_field, &signature);
            self.signature_applied = true;
        }
        &self.fields
    }

    /// The accumulated raw (unescaped) HTML field pairs.
    pub fn raw_html_fields(&self) -> &[(String, String)] {
        &self.raw_html_fields
    }

    /// HTTP method for the redirect form.
    pub fn form_method(&self) -> &'static str {
        "POST"
    }

    /// Whether this transaction runs in test mode.
    pub fn test(&self) -> bool {
        self.test
    }

    /// Reads one accumulated wire field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The immutable order identity.
    pub fn order(&self) -> &str {
        &self.order
    }

    /// The immutable merchant account identity.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Second credential slot, when supplied.
    pub fn credential2(&self) -> Option<&str> {
        self.credential2.as_deref()
    }

    /// Third credential slot, when supplied.
    pub fn credential3(&self) -> Option<&str> {
        self.credential3.as_deref()
    }

    /// Fourth credential slot, when supplied.
    pub fn credential4(&self) -> Option<&str> {
        self.credential4.as_deref()
    }
}
