//! Declarative option validation.
//!
//! Each converter option that has a format or range rule is described by a
//! `Rule`; one shared routine checks values and formats the error message.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::error::{ApiError, VALIDATION_STATUS};

/// Reason code for an option value rejected on the client.
pub const INVALID_VALUE_REASON: i32 = 311;

/// Compiled `Check::Pattern` regexes, keyed by pattern source.
static PATTERNS: Lazy<Mutex<HashMap<&'static str, Regex>>> = Lazy::new(Default::default);

fn full_match(pattern: &'static str, value: &str) -> bool {
    let mut patterns = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = patterns.get(pattern) {
        return re.is_match(value);
    }
    match RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => {
            let matched = re.is_match(value);
            patterns.insert(pattern, re);
            matched
        }
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Check {
    /// Case-insensitive regex that must match the whole value.
    Pattern(&'static str),
    /// Inclusive integer range.
    Range(i64, i64),
    NonEmpty,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub field: &'static str,
    /// Converter documentation slug, e.g. `html-to-pdf`.
    pub converter: &'static str,
    /// Anchor of the option in the converter reference.
    pub anchor: &'static str,
    pub hint: &'static str,
    pub check: Check,
}

impl Rule {
    pub const fn new(
        field: &'static str,
        converter: &'static str,
        anchor: &'static str,
        hint: &'static str,
        check: Check,
    ) -> Self {
        Self {
            field,
            converter,
            anchor,
            hint,
            check,
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self.check {
            Check::Pattern(pattern) => full_match(pattern, value),
            Check::Range(min, max) => value
                .trim()
                .parse::<i64>()
                .map(|n| (min..=max).contains(&n))
                .unwrap_or(false),
            Check::NonEmpty => !value.is_empty(),
        }
    }

    pub fn validate(&self, value: &str) -> Result<(), ApiError> {
        if self.accepts(value) {
            return Ok(());
        }
        Err(ApiError::validation(&create_invalid_value_message(
            value,
            self.field,
            self.converter,
            self.hint,
            self.anchor,
        )))
    }
}

/// The message every option setter produces for a rejected value.
pub fn create_invalid_value_message(
    value: &str,
    field: &str,
    converter: &str,
    hint: &str,
    anchor: &str,
) -> String {
    let mut message = format!(
        "{VALIDATION_STATUS}.{INVALID_VALUE_REASON} - Invalid value '{value}' for the '{field}' option."
    );
    if !hint.is_empty() {
        message.push(' ');
        message.push_str(hint);
    }
    message.push_str(&format!(
        " Documentation link: https://pdfcrowd.com/api/{converter}-rust/ref/#{anchor}"
    ));
    message
}
