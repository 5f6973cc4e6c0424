//! Property tests for the default masking catalog.

use paylog::masking::MaskingEngine;
use proptest::prelude::*;

const SENSITIVE: &[&str] = &[
    "4532015112345678",
    "4532 0151 1234 5678",
    "FR7630006000011234567890189",
    "jean.dupont@email.com",
    "+33612345678",
    "06 12 34 56 78",
    "cvv=123",
    "1 85 12 75 108 123 45",
];

const BENIGN: &[&str] = &["paid", "to", "ref", "amount", "EUR", "42", "status:", "ok"];

fn arb_fragment() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        proptest::sample::select(SENSITIVE),
        proptest::sample::select(BENIGN),
    ]
}

/// Space-separated mix of sensitive values and ordinary words.
fn arb_log_line() -> impl Strategy<Value = String> {
    proptest::collection::vec(arb_fragment(), 1..12).prop_map(|parts| parts.join(" "))
}

/// Like [`arb_log_line`], but fragments are sometimes glued with no separator.
fn arb_glued_line() -> impl Strategy<Value = String> {
    proptest::collection::vec((arb_fragment(), any::<bool>()), 1..12).prop_map(|parts| {
        let mut line = String::new();
        for (fragment, spaced) in parts {
            if spaced && !line.is_empty() {
                line.push(' ');
            }
            line.push_str(fragment);
        }
        line
    })
}

proptest! {
    #[test]
    fn prop_masking_is_idempotent(line in arb_glued_line()) {
        let masker = MaskingEngine::with_defaults().unwrap();
        let once = masker.mask(&line);
        prop_assert_eq!(masker.mask(&once), once);
    }

    #[test]
    fn prop_no_sensitive_value_survives(line in arb_log_line()) {
        let masker = MaskingEngine::with_defaults().unwrap();
        let masked = masker.mask(&line);
        for value in SENSITIVE {
            prop_assert!(!masked.contains(value), "{} leaked in {}", value, masked);
        }
    }

    #[test]
    fn prop_plain_text_is_untouched(line in "[a-z ,.!]{0,60}") {
        let masker = MaskingEngine::with_defaults().unwrap();
        prop_assert_eq!(masker.mask(&line), line);
    }

    #[test]
    fn prop_json_masking_is_idempotent(line in arb_glued_line()) {
        let masker = MaskingEngine::with_defaults().unwrap();
        let value = serde_json::json!({ "note": line, "nested": [{ "memo": line }] });
        let once = masker.mask_json(&value);
        prop_assert_eq!(masker.mask_json(&once), once);
    }
}
