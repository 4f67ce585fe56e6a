//! Raw SQL literal tokens to typed field values.
//!
//! Rules, applied in order:
//! - surrounding whitespace is trimmed
//! - `NULL` (any case) is absent
//! - one matching pair of `'` or `"` quotes is stripped
//! - doubled single quotes (`''`) are unescaped, after quote stripping
//! - an empty result is absent
//!
//! Nothing here fails. Malformed input degrades to [`FieldValue::Absent`].

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::FieldValue;

/// Timestamp formats accepted for date columns, tried in order.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize one raw token into absent or text.
pub fn normalize(token: &str) -> FieldValue<'_> {
    let value = token.trim();
    if value.eq_ignore_ascii_case("NULL") {
        return FieldValue::Absent;
    }

    let unquoted = strip_quotes(value);
    let text = if unquoted.contains("''") {
        Cow::Owned(unquoted.replace("''", "'"))
    } else {
        Cow::Borrowed(unquoted)
    };

    if text.is_empty() {
        FieldValue::Absent
    } else {
        FieldValue::Text(text)
    }
}

/// Normalize a token and parse it as a timestamp.
///
/// Absent tokens and tokens matching none of the accepted formats are absent.
pub fn normalize_date(token: &str) -> FieldValue<'static> {
    match normalize(token).as_text().and_then(parse_date) {
        Some(dt) => FieldValue::DateTime(dt),
        None => FieldValue::Absent,
    }
}

/// Normalize a token as a legacy BIT flag: exactly `1` is true.
pub fn normalize_flag(token: &str) -> FieldValue<'static> {
    FieldValue::Flag(normalize(token).as_text() == Some("1"))
}

/// Parse already-normalized text with the legacy formats.
///
/// Date-only values become midnight.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() == 1 && value.starts_with(quote) {
            return "";
        }
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
