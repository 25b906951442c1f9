use serde_json::{Map, Value};
use thiserror::Error;

const MAX_SLUG_LEN: usize = 64;
const MAX_GENRES: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EpkValidationError {
    #[error("artist_name must not be empty")]
    EmptyArtistName,
    #[error("slug must contain at least one letter or digit")]
    EmptySlug,
    #[error("contact_email must be a valid email address")]
    InvalidEmail,
    #[error("link {0} must be an http(s) URL")]
    InvalidLink(String),
    #[error("links must map labels to URL strings")]
    LinksNotStrings,
    #[error("at most 12 genres are allowed")]
    TooManyGenres,
}

/// Lower-case ASCII alphanumerics separated by single dashes.
pub fn slugify(raw: &str) -> Result<String, EpkValidationError> {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        return Err(EpkValidationError::EmptySlug);
    }
    Ok(slug)
}

pub fn validate_email(raw: &str) -> Result<String, EpkValidationError> {
    let trimmed = raw.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(EpkValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || trimmed.contains(' ') {
        return Err(EpkValidationError::InvalidEmail);
    }
    Ok(trimmed.to_string())
}

/// Links are a `label -> url` object. Labels are trimmed, empty values dropped.
pub fn validate_links(links: &Map<String, Value>) -> Result<Map<String, Value>, EpkValidationError> {
    let mut normalized = Map::new();
    for (label, value) in links {
        let Value::String(url) = value else {
            return Err(EpkValidationError::LinksNotStrings);
        };
        let url = url.trim();
        if url.is_empty() {
            continue;
        }
        let valid = url::Url::parse(url)
            .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            return Err(EpkValidationError::InvalidLink(label.clone()));
        }
        normalized.insert(label.trim().to_string(), Value::String(url.to_string()));
    }
    Ok(normalized)
}

pub fn normalize_genres<S: AsRef<str>>(genres: &[S]) -> Result<Vec<String>, EpkValidationError> {
    let mut normalized: Vec<String> = Vec::new();
    for genre in genres {
        let genre = genre.as_ref().trim();
        if genre.is_empty() {
            continue;
        }
        if !normalized.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
            normalized.push(genre.to_string());
        }
    }
    if normalized.len() > MAX_GENRES {
        return Err(EpkValidationError::TooManyGenres);
    }
    Ok(normalized)
}
