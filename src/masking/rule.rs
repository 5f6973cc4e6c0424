//! A single pattern → replacement masking rule.

use std::borrow::Cow;
use regex::Regex;

use crate::masking::MaskingError;

/// An immutable detection pattern paired with a replacement template.
///
/// The template uses `regex` syntax for capture groups (`${1}`, `${name}`).
#[derive(Debug, Clone)]
pub struct MaskingRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl MaskingRule {
    /// Compile a rule. Fails if the pattern is not a valid regex.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, MaskingError> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|source| MaskingError::InvalidPattern {
            name: name.clone(),
            source,
        })?;

        Ok(Self {
            name,
            pattern,
            replacement: replacement.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every match in `input`. Borrows when nothing matched.
    pub fn apply<'t>(&self, input: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(input, self.replacement.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_fails_at_construction() {
        let err = MaskingRule::new("broken", "([0-9]", "***").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_apply_uses_capture_groups() {
        let rule = MaskingRule::new("token", r"tok_([a-z]{2})[a-z]+", "tok_${1}***").unwrap();
        assert_eq!(rule.apply("key=tok_abcdef"), "key=tok_ab***");
    }

    #[test]
    fn test_apply_borrows_when_no_match() {
        let rule = MaskingRule::new("token", r"tok_[a-z]+", "tok_***").unwrap();
        assert!(matches!(rule.apply("nothing here"), Cow::Borrowed(_)));
    }
}
