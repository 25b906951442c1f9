//! BOX IDs: the short, shareable handle users exchange to find each other.

use rand::Rng;
use thiserror::Error;

pub const BOX_ID_PREFIX: &str = "BOX-";
pub const BOX_ID_LEN: usize = 6;
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoxIdError {
    #[error("BOX ID must be BOX- followed by 6 letters or digits")]
    Malformed,
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..BOX_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{BOX_ID_PREFIX}{suffix}")
}

/// Accepts `box-ab12cd`, ` AB12CD ` and similar; returns the canonical form.
pub fn normalize(input: &str) -> Result<String, BoxIdError> {
    let upper = input.trim().to_ascii_uppercase();
    let suffix = upper.strip_prefix(BOX_ID_PREFIX).unwrap_or(&upper);
    if suffix.len() != BOX_ID_LEN || !suffix.bytes().all(|b| ALPHABET.contains(&b)) {
        return Err(BoxIdError::Malformed);
    }
    Ok(format!("{BOX_ID_PREFIX}{suffix}"))
}
