//! Reference generator for `PurchaseRequestEventV1`.

use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::generator::{inject_hotkey, rng_from_seed, EventGenerator};
use crate::generators::numeric::format_minor_units;
use crate::generators::text::{generate_digits, generate_hex};
use crate::generators::uuid::generate_uuid_v4;

/// Avro schema of the reference event.
pub const PURCHASE_REQUEST_V1_SCHEMA: &str = r#"{
  "type": "record",
  "name": "PurchaseRequestEventV1",
  "namespace": "com.example.payments",
  "fields": [
    {"name": "Composite", "type": "string"},
    {"name": "Details", "type": {
      "type": "record",
      "name": "Details",
      "fields": [
        {"name": "EventAt", "type": "string"},
        {"name": "TraceId", "type": "string"},
        {"name": "SpanId", "type": "string"},
        {"name": "ParentSpanId", "type": "string"},
        {"name": "Component", "type": "string"},
        {"name": "Method", "type": "string"},
        {"name": "Info", "type": ["null", "string"], "default": null},
        {"name": "Activity", "type": "string"},
        {"name": "SentAt", "type": "string"},
        {"name": "OrganizationId", "type": ["null", "string"], "default": null},
        {"name": "IdempotencyKey", "type": "string"},
        {"name": "DataClassification", "type": "string"},
        {"name": "Category", "type": "string"}
      ]
    }},
    {"name": "State", "type": {
      "type": "record",
      "name": "State",
      "fields": [
        {"name": "MerchantId", "type": "string"},
        {"name": "InstanceId", "type": "string"},
        {"name": "TransactionId", "type": "string"},
        {"name": "CorrelationId", "type": "string"},
        {"name": "RequestTimestampUtc", "type": "string"},
        {"name": "CustomerReference", "type": "string"},
        {"name": "RequestMeta", "type": ["null", "string"], "default": null},
        {"name": "PanStart", "type": "string"},
        {"name": "PanStartEight", "type": ["null", "string"], "default": null},
        {"name": "PanEnd", "type": "string"},
        {"name": "PanSequenceNumber", "type": ["null", "string"], "default": null},
        {"name": "CardApplicationId", "type": "string"},
        {"name": "EntryMode", "type": "string"},
        {"name": "Scheme", "type": "string"},
        {"name": "SchemeId", "type": "string"},
        {"name": "CardApplicationLabel", "type": ["null", "string"], "default": null},
        {"name": "CardApplicationPreferredName", "type": ["null", "string"], "default": null},
        {"name": "CardholderVerificationMethod", "type": "string"},
        {"name": "CardholderVerificationMethodResults", "type": ["null", "string"], "default": null},
        {"name": "Amount", "type": "long"},
        {"name": "AmountFormatted", "type": "string"},
        {"name": "Currency", "type": "string"},
        {"name": "CurrencyCode", "type": "string"},
        {"name": "RequestProductFeatures", "type": ["null", "string"], "default": null},
        {"name": "ApplicationCryptogram", "type": ["null", "string"], "default": null},
        {"name": "Platform", "type": "string"},
        {"name": "TransactionType", "type": "string"}
      ]
    }},
    {"name": "hotkeyId", "type": ["null", "int"], "default": null}
  ]
}"#;

const COMPONENTS: &[&str] = &[
    "PurchaseService",
    "RefundService",
    "CryptoService",
    "KeyManagerService",
    "AcquirerService",
];
const ACTIVITIES: &[&str] = &[
    "Started", "Stopped", "Created", "Sent", "Received", "Warning", "Exception",
];
const CLASSIFICATIONS: &[&str] = &["Green", "Amber", "Red", "Blue"];
const CATEGORIES: &[&str] = &[
    "Critical",
    "Warning",
    "Performance",
    "Error",
    "Notice",
    "Informational",
    "Debug",
];
const METHODS: &[&str] = &[
    "ProcessTransaction",
    "AuthorizePayment",
    "CapturePayment",
    "ValidateCard",
];
const INFO_LINES: &[&str] = &[
    "A sample transaction event.",
    "Authorization forwarded to acquirer.",
    "Card data validated.",
    "Terminal reported a retry.",
];
const ENTRY_MODES: &[&str] = &["CONTACTLESS", "CHIP", "SWIPE", "MANUAL"];
const SCHEMES: &[(&str, &str, &str)] = &[
    ("VISA", "1", "A0000000031010"),
    ("MASTERCARD", "2", "A0000000041010"),
    ("AMEX", "3", "A00000002501"),
    ("DISCOVER", "4", "A0000001523010"),
];
const LABELS: &[&str] = &["DEBIT", "CREDIT", "PREPAID"];
const CVMS: &[&str] = &["PIN", "SIGNATURE", "CDCVM", "NONE"];
const CURRENCIES: &[(&str, &str)] = &[
    ("USD", "840"),
    ("EUR", "978"),
    ("GBP", "826"),
    ("JPY", "392"),
    ("AUD", "036"),
];
const PLATFORMS: &[&str] = &["POS", "ECOM", "MOTO"];
const TRANSACTION_TYPES: &[&str] = &["PURCHASE", "REFUND", "PREAUTH"];
const REFERENCE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Tracing and envelope metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Details {
    pub event_at: String,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: String,
    pub component: String,
    pub method: String,
    pub info: Option<String>,
    pub activity: String,
    pub sent_at: String,
    pub organization_id: Option<String>,
    pub idempotency_key: String,
    pub data_classification: String,
    pub category: String,
}

/// Purchase transaction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct State {
    pub merchant_id: String,
    pub instance_id: String,
    pub transaction_id: String,
    pub correlation_id: String,
    pub request_timestamp_utc: String,
    pub customer_reference: String,
    pub request_meta: Option<String>,
    pub pan_start: String,
    pub pan_start_eight: Option<String>,
    pub pan_end: String,
    pub pan_sequence_number: Option<String>,
    pub card_application_id: String,
    pub entry_mode: String,
    pub scheme: String,
    pub scheme_id: String,
    pub card_application_label: Option<String>,
    pub card_application_preferred_name: Option<String>,
    pub cardholder_verification_method: String,
    pub cardholder_verification_method_results: Option<String>,
    /// Amount in minor units
    pub amount: i64,
    /// `amount / 100` with two decimals
    pub amount_formatted: String,
    pub currency: String,
    pub currency_code: String,
    pub request_product_features: Option<String>,
    pub application_cryptogram: Option<String>,
    pub platform: String,
    pub transaction_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchaseRequestEvent {
    pub composite: String,
    pub details: Details,
    pub state: State,
}

/// Generator for [`PurchaseRequestEvent`].
pub struct PurchaseRequestGenerator {
    rng: StdRng,
}

impl PurchaseRequestGenerator {
    pub const NAME: &'static str = "PurchaseRequestEventV1";

    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
        }
    }

    /// Generate the typed record.
    pub fn next_record(&mut self) -> PurchaseRequestEvent {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);

        let details = Details {
            event_at: now.clone(),
            trace_id: generate_hex(&mut self.rng, 32),
            span_id: generate_hex(&mut self.rng, 16),
            parent_span_id: generate_hex(&mut self.rng, 16),
            component: self.pick(COMPONENTS),
            method: self.pick(METHODS),
            info: self.maybe(|g| g.pick(INFO_LINES)),
            activity: self.pick(ACTIVITIES),
            sent_at: now.clone(),
            organization_id: self.maybe(|g| g.uuid()),
            idempotency_key: self.uuid(),
            data_classification: self.pick(CLASSIFICATIONS),
            category: self.pick(CATEGORIES),
        };

        // One draw feeds both amount fields
        let amount = self.rng.gen_range(100..=100_000i64);
        let amount_formatted = format_minor_units(amount, 2);

        let (scheme, scheme_id, application_id) = *SCHEMES
            .choose(&mut self.rng)
            .unwrap_or(&SCHEMES[0]);
        let (currency, currency_code) = *CURRENCIES
            .choose(&mut self.rng)
            .unwrap_or(&CURRENCIES[0]);

        let state = State {
            merchant_id: self.uuid(),
            instance_id: self.uuid(),
            transaction_id: self.uuid(),
            correlation_id: self.uuid(),
            request_timestamp_utc: now,
            customer_reference: self.customer_reference(),
            request_meta: self.maybe(|g| {
                format!(r#"{{"terminal":"T{}"}}"#, generate_digits(&mut g.rng, 4))
            }),
            pan_start: generate_digits(&mut self.rng, 6),
            pan_start_eight: self.maybe(|g| generate_digits(&mut g.rng, 8)),
            pan_end: generate_digits(&mut self.rng, 4),
            pan_sequence_number: self.maybe(|g| generate_digits(&mut g.rng, 2)),
            card_application_id: application_id.to_string(),
            entry_mode: self.pick(ENTRY_MODES),
            scheme: scheme.to_string(),
            scheme_id: scheme_id.to_string(),
            card_application_label: self.maybe(|g| format!("{scheme} {}", g.pick(LABELS))),
            card_application_preferred_name: self.maybe(|g| g.pick(LABELS)),
            cardholder_verification_method: self.pick(CVMS),
            cardholder_verification_method_results: self
                .maybe(|g| generate_hex(&mut g.rng, 8)),
            amount,
            amount_formatted,
            currency: currency.to_string(),
            currency_code: currency_code.to_string(),
            request_product_features: self.maybe(|g| {
                format!(r#"{{"cashback":{}}}"#, g.rng.gen_bool(0.2))
            }),
            application_cryptogram: self.maybe(|g| generate_hex(&mut g.rng, 16)),
            platform: self.pick(PLATFORMS),
            transaction_type: self.pick(TRANSACTION_TYPES),
        };

        PurchaseRequestEvent {
            composite: Self::NAME.to_string(),
            details,
            state,
        }
    }

    fn pick(&mut self, pool: &[&str]) -> String {
        pool.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }

    fn uuid(&mut self) -> String {
        generate_uuid_v4(&mut self.rng).hyphenated().to_string()
    }

    /// Null half of the time, otherwise the generated value.
    fn maybe(&mut self, f: impl FnOnce(&mut Self) -> String) -> Option<String> {
        if self.rng.gen_bool(0.5) {
            None
        } else {
            Some(f(self))
        }
    }

    fn customer_reference(&mut self) -> String {
        let len = self.rng.gen_range(10..=20);
        (0..len)
            .map(|_| REFERENCE_CHARS[self.rng.gen_range(0..REFERENCE_CHARS.len())] as char)
            .collect()
    }
}

impl EventGenerator for PurchaseRequestGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&mut self, add_hotkey: bool) -> Event {
        let record = self.next_record();
        let mut event = Event::from_record(&record).unwrap_or_default();
        if add_hotkey {
            inject_hotkey(&mut event, &mut self.rng);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HOTKEY_RANGE;
    use uuid::Uuid;

    fn is_lower_hex(s: &str, len: usize) -> bool {
        s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    fn is_uuid(s: &str) -> bool {
        s.len() == 36 && Uuid::parse_str(s).is_ok()
    }

    #[test]
    fn test_amount_formatted_matches_amount() {
        let mut generator = PurchaseRequestGenerator::new(Some(42));
        for _ in 0..1000 {
            let event = generator.generate(false);
            let amount = event.get_path("State.Amount").unwrap().as_i64().unwrap();
            let formatted: f64 = event
                .get_path("State.AmountFormatted")
                .unwrap()
                .as_str()
                .unwrap()
                .parse()
                .unwrap();
            assert!((100..=100_000).contains(&amount));
            assert!((formatted - amount as f64 / 100.0).abs() < 0.005);
        }
    }

    #[test]
    fn test_identifier_formats() {
        let mut generator = PurchaseRequestGenerator::new(Some(7));
        for _ in 0..200 {
            let record = generator.next_record();
            assert!(is_lower_hex(&record.details.trace_id, 32));
            assert!(is_lower_hex(&record.details.span_id, 16));
            assert!(is_lower_hex(&record.details.parent_span_id, 16));
            assert!(is_uuid(&record.details.idempotency_key));
            if let Some(org) = &record.details.organization_id {
                assert!(is_uuid(org));
            }
            assert!(is_uuid(&record.state.merchant_id));
            assert!(is_uuid(&record.state.transaction_id));
            assert!(is_uuid(&record.state.correlation_id));
        }
    }

    #[test]
    fn test_hotkey_present_only_when_requested() {
        let mut generator = PurchaseRequestGenerator::new(Some(3));
        for _ in 0..200 {
            let with = generator.generate(true);
            assert!(HOTKEY_RANGE.contains(&with.hotkey_id().unwrap()));
            let without = generator.generate(false);
            assert!(without.get(crate::event::HOTKEY_FIELD).is_none());
        }
    }

    #[test]
    fn test_event_shape() {
        let mut generator = PurchaseRequestGenerator::new(None);
        let event = generator.generate(false);
        assert_eq!(
            event.get("Composite").and_then(|v| v.as_str()),
            Some(PurchaseRequestGenerator::NAME)
        );
        assert!(event.get_path("Details.TraceId").is_some());
        assert!(event.get_path("State.CurrencyCode").is_some());
        // Optional fields are serialized as explicit nulls or strings
        let info = event.get_path("Details.Info").unwrap();
        assert!(info.is_null() || info.is_string());
    }

    #[test]
    fn test_currency_code_matches_currency() {
        let mut generator = PurchaseRequestGenerator::new(Some(11));
        for _ in 0..100 {
            let state = generator.next_record().state;
            let expected = CURRENCIES
                .iter()
                .find(|(c, _)| *c == state.currency)
                .map(|(_, code)| *code);
            assert_eq!(expected, Some(state.currency_code.as_str()));
        }
    }
}
