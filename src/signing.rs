//! The shared signing engine.
//!
//! Nearly every redirect gateway authenticates payloads with some hash of a
//! concatenated field string and a shared secret, but each picks its own
//! digest, field order, separator, and secret position. Rather than ad hoc
//! string assembly per gateway, each integration declares a [`SigningSpec`]
//! (ordered field references + algorithm + secret placement) and this module
//! interprets it — so the canonical-string construction is plain data and
//! independently testable per gateway.
//!
//! Comparison against a presented signature uses constant-time equality.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

/// Digest algorithm for a gateway signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// Plain MD5 over the canonical string
    Md5,
    /// Plain SHA-1
    Sha1,
    /// Plain SHA-256
    Sha256,
    /// Plain SHA-512
    Sha512,
    /// HMAC-MD5 keyed with the shared secret
    HmacMd5,
    /// HMAC-SHA1 keyed with the shared secret
    HmacSha1,
    /// HMAC-SHA256 keyed with the shared secret
    HmacSha256,
    /// HMAC-SHA512 keyed with the shared secret
    HmacSha512,
}

/// How the computed digest is presented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureEncoding {
    /// Lowercase hexadecimal (the overwhelming default)
    #[default]
    Hex,
    /// Base64 (a handful of gateways)
    Base64,
}

/// Where the shared secret enters the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretPlacement {
    /// Joined ahead of the field values with the spec's separator
    Prefix,
    /// Joined after the field values with the spec's separator
    Suffix,
    /// Used as the HMAC key; the canonical string carries fields only
    HmacKey,
}

// HMAC accepts keys of any length, so new_from_slice cannot fail here.
macro_rules! hmac_bytes {
    ($digest:ty, $secret:expr, $data:expr) => {{
        let mut mac = Hmac::<$digest>::new_from_slice($secret.as_bytes())
            .expect("HMAC can take a key of any size");
        mac.update($data);
        mac.finalize().into_bytes().to_vec()
    }};
}

/// A per-gateway declarative signature recipe.
///
/// # Examples
///
/// ```
/// use offsite_payments_rs::signing::{
///     SecretPlacement, SignatureAlgorithm, SigningSpec,
/// };
///
/// // MD5 of "secret:order:amount" joined by ':'
/// let spec = SigningSpec::new(
///     SignatureAlgorithm::Md5,
///     &["order", "amount"],
///     "s3cr3t",
///     SecretPlacement::Prefix,
///     ":",
///     "signature",
/// );
///
/// let lookup = |name: &str| match name {
///     "order" => Some("55".to_string()),
///     "amount" => Some("10.00".to_string()),
///     _ => None,
/// };
/// assert_eq!(spec.canonical_string(&lookup), "s3cr3t:55:10.00");
/// assert!(spec.verify(&lookup, &spec.compute(&lookup)));
/// ```
#[derive(Debug, Clone)]
pub struct SigningSpec {
    /// Digest algorithm
    pub algorithm: SignatureAlgorithm,
    /// Ordered field references making up the canonical string; a missing
    /// field contributes an empty string (gateways sign fixed positions)
    pub fields: Vec<String>,
    /// Shared secret material
    pub secret: String,
    /// Where the secret enters the computation
    pub secret_placement: SecretPlacement,
    /// Separator joining the canonical-string parts
    pub separator: String,
    /// Wire field the signature is written to / read from
    pub output_field: String,
    /// Digest presentation
    pub encoding: SignatureEncoding,
}

impl SigningSpec {
    /// Creates a hex-encoded signing spec.
    pub fn new(
        algorithm: SignatureAlgorithm,
        fields: &[&str],
        secret: impl Into<String>,
        secret_placement: SecretPlacement,
        separator: impl Into<String>,
        output_field: impl Into<String>,
    ) -> Self {
        Self {
            algorithm,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            secret: secret.into(),
            secret_placement,
            separator: separator.into(),
            output_field: output_field.into(),
            encoding: SignatureEncoding::Hex,
        }
    }

    /// Switches the digest presentation to Base64.
    pub fn with_base64(mut self) -> Self {
        self.encoding = SignatureEncoding::Base64;
        self
    }

    /// Builds the canonical signing string from the ordered field references.
    ///
    /// Fields the lookup cannot supply contribute empty strings: gateways
    /// sign fixed positions, so a blank optional field still occupies its
    /// slot in the concatenation.
    pub fn canonical_string(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.fields.len() + 1);
        if self.secret_placement == SecretPlacement::Prefix {
            parts.push(self.secret.clone());
        }
        for field in &self.fields {
            parts.push(lookup(field).unwrap_or_default());
        }
        if self.secret_placement == SecretPlacement::Suffix {
            parts.push(self.secret.clone());
        }
        parts.join(&self.separator)
    }

    /// Computes the encoded signature for the current field values.
    pub fn compute(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        let canonical = self.canonical_string(lookup);
        let digest = self.digest(canonical.as_bytes());
        match self.encoding {
            SignatureEncoding::Hex => hex::encode(digest),
            SignatureEncoding::Base64 => BASE64.encode(digest),
        }
    }

    /// Verifies a presented signature in constant time.
    ///
    /// Hex comparison is case-insensitive; gateways are inconsistent about
    /// digest casing.
    pub fn verify(&self, lookup: &dyn Fn(&str) -> Option<String>, presented: &str) -> bool {
        let expected = self.compute(lookup);
        let (expected, presented) = match self.encoding {
            SignatureEncoding::Hex => (expected.to_lowercase(), presented.to_lowercase()),
            SignatureEncoding::Base64 => (expected, presented.to_string()),
        };

        if expected.len() != presented.len() {
            tracing::debug!(field = %self.output_field, "signature length mismatch");
            return false;
        }
        let matched: bool = expected.as_bytes().ct_eq(presented.as_bytes()).into();
        if !matched {
            tracing::debug!(field = %self.output_field, "signature mismatch");
        }
        matched
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self.algorithm {
            SignatureAlgorithm::Md5 => Md5::digest(data).to_vec(),
            SignatureAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            SignatureAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            SignatureAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
            SignatureAlgorithm::HmacMd5 => hmac_bytes!(Md5, self.secret, data),
            SignatureAlgorithm::HmacSha1 => hmac_bytes!(Sha1, self.secret, data),
            SignatureAlgorithm::HmacSha256 => hmac_bytes!(Sha256, self.secret, data),
            SignatureAlgorithm::HmacSha512 => hmac_bytes!(Sha512, self.secret, data),
        }
    }
}
