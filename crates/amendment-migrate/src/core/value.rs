//! Typed field values produced by normalizing raw dump tokens.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde::Serialize;

/// A normalized dump field.
///
/// Text borrows from the raw token when no unescaping was needed, so a
/// typical row allocates only for fields containing doubled quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldValue<'a> {
    /// `NULL`, an empty literal, an unparseable date, or a missing position.
    Absent,

    /// Unquoted, unescaped text.
    Text(Cow<'a, str>),

    /// Timestamp parsed from one of the accepted legacy formats.
    DateTime(NaiveDateTime),

    /// Legacy BIT column (`1` is true, anything else false).
    Flag(bool),
}

impl<'a> FieldValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> FieldValue<'static> {
        match self {
            FieldValue::Absent => FieldValue::Absent,
            FieldValue::Text(v) => FieldValue::Text(Cow::Owned(v.into_owned())),
            FieldValue::DateTime(v) => FieldValue::DateTime(v),
            FieldValue::Flag(v) => FieldValue::Flag(v),
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// The text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Take the text content, if this is a text value.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(v) => Some(v.into_owned()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Flag value; absent and non-flag values read as false.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        matches!(self, FieldValue::Flag(true))
    }
}

impl From<Option<String>> for FieldValue<'static> {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(s) => FieldValue::Text(Cow::Owned(s)),
            None => FieldValue::Absent,
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(v: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(v))
    }
}

impl From<NaiveDateTime> for FieldValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::DateTime(v)
    }
}

impl From<bool> for FieldValue<'static> {
    fn from(v: bool) -> Self {
        FieldValue::Flag(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_into_owned() {
        let borrowed: FieldValue<'_> = FieldValue::Text(Cow::Borrowed("hello"));
        let owned: FieldValue<'static> = borrowed.into_owned();
        assert_eq!(owned, FieldValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_absent_accessors() {
        let v = FieldValue::Absent;
        assert!(v.is_absent());
        assert_eq!(v.as_text(), None);
        assert!(!v.as_flag());
        assert_eq!(v.into_text(), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(FieldValue::from(None::<String>), FieldValue::Absent);
        assert_eq!(
            FieldValue::from(Some("x".to_string())).as_text(),
            Some("x")
        );
    }
}
