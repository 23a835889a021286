//! Input guards run before any I/O.
//!
//! Identifiers end up inside cache keys (colon separated) and URL paths, so
//! they are restricted to characters that are safe in both.

use crate::error::{Error, Result};

const MAX_ID_LEN: usize = 128;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn check_identifier(what: &str, value: &str) -> Result<()> {
    let starts_ok = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());

    if !starts_ok || value.len() > MAX_ID_LEN || !value.chars().all(is_id_char) {
        return Err(Error::invalid(format!("invalid {}: {:?}", what, value)));
    }
    Ok(())
}

pub fn project_id(value: &str) -> Result<()> {
    check_identifier("project id", value)
}

pub fn collection_slug(value: &str) -> Result<()> {
    check_identifier("collection slug", value)
}

pub fn asset_id(value: &str) -> Result<()> {
    check_identifier("asset id", value)
}

pub fn item_id(value: &str) -> Result<()> {
    check_identifier("item id", value)
}

/// BCP-47 style tag: a 2-3 letter language, then `-`-separated subtags of
/// 2-8 alphanumerics (`en`, `en-US`, `zh-Hant-TW`).
pub fn locale(value: &str) -> Result<()> {
    let mut parts = value.split('-');
    let language_ok = parts
        .next()
        .is_some_and(|l| (2..=3).contains(&l.len()) && l.chars().all(|c| c.is_ascii_alphabetic()));
    let subtags_ok = parts.all(|s| (2..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()));

    if language_ok && subtags_ok {
        Ok(())
    } else {
        Err(Error::invalid(format!("invalid locale: {:?}", value)))
    }
}

/// Transform dimensions must be strictly positive when given.
pub fn dimension(name: &str, value: Option<u32>) -> Result<()> {
    match value {
        Some(0) => Err(Error::invalid(format!("{} must be greater than zero", name))),
        _ => Ok(()),
    }
}
