use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::constants::{text::RTL_CHARS_REGEX, DEFAULT_QUOTE_MAX_LENGTH, NAME_MAX_LENGTH};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub id: Uuid,
    pub full_name: String,
    pub quote: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Any right-to-left character makes the whole field right-to-left.
    pub fn of(text: &str) -> Self {
        match RTL_CHARS_REGEX.is_match(text) {
            Ok(true) => TextDirection::Rtl,
            _ => TextDirection::Ltr,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub name_max: usize,
    pub quote_max: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            name_max: NAME_MAX_LENGTH,
            quote_max: DEFAULT_QUOTE_MAX_LENGTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    FullName,
    Quote,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::FullName => f.write_str("full name"),
            Field::Quote => f.write_str("quote"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter your full name")]
    EmptyName,

    #[error("please write your quote")]
    EmptyQuote,

    #[error("{field} must be at most {max} characters")]
    TooLong { field: Field, max: usize },
}

/// Form contents as typed. Input longer than the limits is cut off at the
/// limit, the way a `maxlength` input behaves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteDraft {
    full_name: String,
    quote: String,
}

impl QuoteDraft {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn set_full_name(&mut self, value: &str, limits: &Limits) {
        self.full_name = truncate_chars(value, limits.name_max);
    }

    pub fn set_quote(&mut self, value: &str, limits: &Limits) {
        self.quote = truncate_chars(value, limits.quote_max);
    }

    pub fn has_name(&self) -> bool {
        !self.full_name.trim().is_empty()
    }

    pub fn has_quote(&self) -> bool {
        !self.quote.trim().is_empty()
    }
}

/// A trimmed, non-empty, length-checked insert payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuote {
    full_name: String,
    quote: String,
}

impl NewQuote {
    pub fn new(full_name: &str, quote: &str, limits: &Limits) -> Result<Self, ValidationError> {
        let full_name = full_name.trim();
        let quote = quote.trim();

        if full_name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if quote.is_empty() {
            return Err(ValidationError::EmptyQuote);
        }

        if full_name.chars().count() > limits.name_max {
            return Err(ValidationError::TooLong {
                field: Field::FullName,
                max: limits.name_max,
            });
        }

        if quote.chars().count() > limits.quote_max {
            return Err(ValidationError::TooLong {
                field: Field::Quote,
                max: limits.quote_max,
            });
        }

        Ok(NewQuote {
            full_name: full_name.to_string(),
            quote: quote.to_string(),
        })
    }

    pub fn from_draft(draft: &QuoteDraft, limits: &Limits) -> Result<Self, ValidationError> {
        Self::new(draft.full_name(), draft.quote(), limits)
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}
