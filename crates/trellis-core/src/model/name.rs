//! Validation rules for node names, date names and aliases.

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Longest accepted name or alias, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// `strftime` format of date-node names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether `name` is a canonical `YYYY-MM-DD` calendar date.
///
/// The name must round-trip through the date format exactly, so `2020-1-1`
/// or `2020-02-30` are ordinary names.
#[must_use]
pub fn is_date_name(name: &str) -> bool {
    NaiveDate::parse_from_str(name, DATE_FORMAT)
        .is_ok_and(|date| date.format(DATE_FORMAT).to_string() == name)
}

/// The date-node name for `date`.
#[must_use]
pub fn date_name(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Check a user-supplied node name.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if the name is blank, longer than
/// [`MAX_NAME_LEN`] characters, contains control characters, or is a
/// reserved date name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName("name must not be empty".to_string()));
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(Error::InvalidName(format!(
            "name is {len} characters long, the limit is {MAX_NAME_LEN}"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::InvalidName(
            "name must not contain control characters".to_string(),
        ));
    }
    if is_date_name(name) {
        return Err(Error::InvalidName(format!(
            "'{name}' is reserved for date nodes"
        )));
    }
    Ok(())
}

/// Check a user-supplied alias.
///
/// Aliases are limited to `[A-Za-z0-9_-]` and may not be all digits or a
/// date, so a selector string is never ambiguous.
///
/// # Errors
///
/// Returns [`Error::InvalidSelector`] when any rule is broken.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(Error::InvalidSelector("alias must not be empty".to_string()));
    }
    if alias.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidSelector(format!(
            "alias is longer than {MAX_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = alias
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(Error::InvalidSelector(format!(
            "alias '{alias}' contains '{bad}', only letters, digits, '_' and '-' are allowed"
        )));
    }
    if alias.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidSelector(format!(
            "alias '{alias}' would be read as a node id"
        )));
    }
    if is_date_name(alias) {
        return Err(Error::InvalidSelector(format!(
            "alias '{alias}' would be read as a date"
        )));
    }
    Ok(())
}
