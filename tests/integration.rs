//! Integration tests for the offsite-payments-rs library.
//!
//! These exercise the public API end to end: building redirect forms
//! through the registry, verifying signed notification payloads, and the
//! framework-wide tolerance and fail-closed properties.

use offsite_payments_rs::country::CountryFormat;
use offsite_payments_rs::gateways::paypal::PaypalNotification;
use offsite_payments_rs::gateways::{lookup, registry, IntegrationMode};
use offsite_payments_rs::helper::HelperOptions;
use offsite_payments_rs::notification::{scale_to_cents, Params, VerificationContext};
use offsite_payments_rs::signing::{SecretPlacement, SignatureAlgorithm, SigningSpec};
use offsite_payments_rs::{OffsiteError, PaymentNotification, PaymentStatus};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn options(amount: &str, currency: &str) -> HelperOptions {
    HelperOptions {
        amount: Some(amount.to_string()),
        currency: Some(currency.to_string()),
        ..Default::default()
    }
}

#[test]
fn helper_maps_address_with_resolved_country() {
    let gateway = lookup("paypal").unwrap();
    let mut helper = gateway
        .helper("123", "merchant", options("500", "USD"), IntegrationMode::Production)
        .unwrap();
    helper.billing_address([("country", "CA"), ("city", "Ottawa")]);

    let fields = helper.form_fields();
    assert_eq!(fields.get("country").map(String::as_str), Some("CA"));
    assert_eq!(fields.get("city").map(String::as_str), Some("Ottawa"));
    assert_eq!(fields.get("amount").map(String::as_str), Some("500"));
}

#[test]
fn helper_country_format_is_per_gateway() {
    // A free-text name resolves to whichever format the helper is
    // configured for
    let gateway = lookup("paypal").unwrap();
    let helper = gateway
        .helper("123", "merchant", HelperOptions::default(), IntegrationMode::Test)
        .unwrap();
    let mut helper = helper.with_country_format(CountryFormat::Alpha3);
    helper.billing_address([("country", "Canada")]);
    assert_eq!(helper.field("country"), Some("CAN"));
}

#[test]
fn unknown_option_key_fails_fast() {
    let err = HelperOptions::from_pairs([("amount", "5.00"), ("bogus_option", "x")]).unwrap_err();
    assert!(matches!(err, OffsiteError::UnknownOption(key) if key == "bogus_option"));
}

#[test]
fn typed_options_deserialize_with_the_same_allow_list() -> anyhow::Result<()> {
    let options: HelperOptions =
        serde_json::from_str(r#"{"amount":"5.00","currency":"USD"}"#)?;
    assert_eq!(options.amount.as_deref(), Some("5.00"));

    let err = serde_json::from_str::<HelperOptions>(r#"{"bogus_option":"x"}"#);
    assert!(err.is_err());
    Ok(())
}

#[test]
fn unmapped_setter_is_a_noop_on_every_gateway() {
    for gateway in registry() {
        let mut helper = match gateway.helper(
            "1",
            "acct",
            HelperOptions {
                credential2: Some("secret".to_string()),
                ..Default::default()
            },
            IntegrationMode::Test,
        ) {
            Ok(helper) => helper,
            Err(_) => continue,
        };
        let before = helper.form_fields().clone();
        helper.set("nonexistent_field", "x");
        assert_eq!(
            helper.form_fields(),
            &before,
            "gateway {} must ignore unmapped attributes",
            gateway.id()
        );
    }
}

#[test]
fn form_fields_are_idempotent_across_the_registry() {
    for gateway in registry() {
        let mut helper = match gateway.helper(
            "1",
            "acct",
            HelperOptions {
                amount: Some("5.00".to_string()),
                credential2: Some("secret".to_string()),
                ..Default::default()
            },
            IntegrationMode::Test,
        ) {
            Ok(helper) => helper,
            Err(_) => continue,
        };
        let first = helper.form_fields().clone();
        assert_eq!(
            helper.form_fields(),
            &first,
            "gateway {} form_fields must be idempotent",
            gateway.id()
        );
    }
}

#[tokio::test]
async fn verification_is_independent_of_stated_status() {
    // Sign a genuine payload, then corrupt the amount: `complete` keeps
    // repeating the stated status while `acknowledge` flips to false
    let salt = "integration-salt";
    let spec = SigningSpec::new(
        SignatureAlgorithm::Sha512,
        &[
            "status", "udf10", "udf9", "udf8", "udf7", "udf6", "udf5", "udf4", "udf3", "udf2",
            "udf1", "email", "firstname", "productinfo", "amount", "txnid", "key",
        ],
        salt,
        SecretPlacement::Prefix,
        "|",
        "hash",
    );
    let genuine = Params::from_pairs([
        ("key", "k"),
        ("txnid", "123"),
        ("amount", "500"),
        ("productinfo", "Widget"),
        ("firstname", "Ada"),
        ("email", "ada@example.com"),
        ("status", "success"),
        ("mihpayid", "987"),
    ]);
    let hash = spec.compute(&genuine.lookup());
    let body: String = genuine
        .iter()
        .map(|(k, v)| format!("{}={}&", k, v))
        .collect::<String>()
        + &format!("hash={}", hash);

    let gateway = lookup("payu").unwrap();
    let context = VerificationContext::new(IntegrationMode::Production).with_secret(salt);

    let notification = gateway.notification(&body, context.clone()).unwrap();
    assert_eq!(notification.status(), PaymentStatus::Completed);
    assert!(notification.complete());
    assert!(notification.acknowledge().await);

    let tampered = body.replace("amount=500", "amount=5000");
    let notification = gateway.notification(&tampered, context).unwrap();
    assert!(notification.complete());
    assert!(!notification.acknowledge().await);
}

#[test]
fn empty_return_keeps_base_defaults() {
    let gateway = lookup("paypal").unwrap();
    let ret = gateway
        .returning("", VerificationContext::default())
        .unwrap();
    assert!(ret.success());
    assert!(!ret.cancelled());
    assert_eq!(ret.message(), "");
}

#[test]
fn gross_cents_rounds_half_up_at_the_cent_boundary() {
    assert_eq!(scale_to_cents("157.005"), Some(15701));
    assert_eq!(scale_to_cents("157.004"), Some(15700));

    let gateway = lookup("paypal").unwrap();
    let notification = gateway
        .notification(
            "payment_status=Completed&mc_gross=157.005",
            VerificationContext::default(),
        )
        .unwrap();
    assert_eq!(notification.gross_cents(), Some(15701));
}

#[tokio::test]
async fn network_verification_fails_closed() {
    init_tracing();
    let context = VerificationContext::new(IntegrationMode::Test)
        .with_timeout(std::time::Duration::from_millis(500));
    let notification =
        PaypalNotification::parse("payment_status=Completed&mc_gross=1.00", context)
            .with_verification_url("http://127.0.0.1:9/webscr");
    assert!(!notification.acknowledge().await);
}

#[test]
fn service_urls_resolve_per_mode_and_fail_fast() {
    let paypal = lookup("paypal").unwrap();
    assert_ne!(
        paypal.service_url(IntegrationMode::Test).unwrap(),
        paypal.service_url(IntegrationMode::Production).unwrap()
    );
    assert!(matches!(
        paypal.service_url(IntegrationMode::Simulate),
        Err(OffsiteError::UnsupportedMode { .. })
    ));

    assert!(matches!(
        "staging".parse::<IntegrationMode>(),
        Err(OffsiteError::UnknownMode(_))
    ));
}
