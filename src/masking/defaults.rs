//! Default masking catalog.
//!
//! The phone and national-id rules follow French formats. Treat the catalog as
//! a starting template: deployments with other locales should swap the rule list
//! through [`MaskingEngine::new`](crate::masking::MaskingEngine::new).
//!
//! Order matters. IBAN runs first: its mask inserts a word boundary, and a card
//! glued to the end of an IBAN must still be visible to the card rules. An IBAN
//! needs two leading letters, so it never consumes a bare PAN. Card rules run
//! next so that the more general digit-grouping rules further down never see a
//! raw PAN.

use crate::masking::{MaskingError, MaskingRule};

/// `(name, pattern, replacement)` for every default rule, in evaluation order.
pub const DEFAULT_RULES: &[(&str, &str, &str)] = &[
    // FR7630006000011234567890189 → FR76************0189
    (
        "iban",
        r"\b([A-Z]{2}\d{2})[A-Z0-9]{8,26}([A-Z0-9]{4})\b",
        "${1}************${2}",
    ),
    // 4532015112345678 → 453201******5678 (13 to 19 digits)
    (
        "card_number",
        r"\b([3-6]\d{5})\d{3,9}(\d{4})\b",
        "${1}******${2}",
    ),
    // 4532 0151 1234 5678 → 4532 01** **** 5678
    (
        "card_number_grouped",
        r"\b([3-6]\d{3})([- ])(\d{2})\d{2}([- ])\d{4}([- ])(\d{4})\b",
        "${1}${2}${3}**${4}****${5}${6}",
    ),
    // jean.dupont@email.com → j***@email.com
    (
        "email",
        r"\b([A-Za-z0-9])[A-Za-z0-9._%+-]*@([A-Za-z0-9.-]+\.[A-Za-z]{2,})\b",
        "${1}***@${2}",
    ),
    // +33612345678 → +336******78, 06 12 34 56 78 → 06******78
    (
        "phone_fr",
        r"(\+33|\b0033|\b0)([1-9])[ .-]?\d{2}[ .-]?\d{2}[ .-]?\d{2}[ .-]?(\d{2})\b",
        "${1}${2}******${3}",
    ),
    // "cvv": "123" → "cvv": "***", cvc=4567 → cvc=***
    (
        "security_code",
        r#"(?i)(cvv|cvc|cvn)(["':\s=]*)\d{3,4}\b"#,
        "${1}${2}***",
    ),
    // 1 85 12 75 108 123 45 → 1 85 ** ** *** *** **
    (
        "national_id_fr",
        r"\b([12])\s?(\d{2})\s?\d{2}\s?\d{2}\s?\d{3}\s?\d{3}\s?\d{2}\b",
        "${1} ${2} ** ** *** *** **",
    ),
];

/// Compile the default catalog.
pub fn default_rules() -> Result<Vec<MaskingRule>, MaskingError> {
    DEFAULT_RULES
        .iter()
        .map(|(name, pattern, replacement)| MaskingRule::new(*name, pattern, *replacement))
        .collect()
}
