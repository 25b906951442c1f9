use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const MAX_TAGS: usize = 32;
const MAX_TAG_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    Idea,
    Lyric,
    Melody,
    Journal,
    Production,
    Business,
}

impl NoteCategory {
    pub const ALL: [NoteCategory; 6] = [
        NoteCategory::Idea,
        NoteCategory::Lyric,
        NoteCategory::Melody,
        NoteCategory::Journal,
        NoteCategory::Production,
        NoteCategory::Business,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteCategory::Idea => "idea",
            NoteCategory::Lyric => "lyric",
            NoteCategory::Melody => "melody",
            NoteCategory::Journal => "journal",
            NoteCategory::Production => "production",
            NoteCategory::Business => "business",
        }
    }
}

impl fmt::Display for NoteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteCategory {
    type Err = NoteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        NoteCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == needle)
            .ok_or_else(|| NoteError::UnknownCategory(value.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("unknown note category: {0}")]
    UnknownCategory(String),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("at most 32 tags are allowed")]
    TooManyTags,
    #[error("tags must be at most 48 characters")]
    TagTooLong,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("ordered_ids must not be empty")]
    Empty,
    #[error("note {0} appears more than once")]
    Duplicate(Uuid),
    #[error("note {0} does not exist")]
    Unknown(Uuid),
}

pub fn normalize_note_title(raw: &str) -> Result<String, NoteError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NoteError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Trims, lower-cases and de-duplicates tags, keeping first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>, NoteError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(NoteError::TagTooLong);
        }
        if seen.insert(tag.clone()) {
            normalized.push(tag);
        }
    }
    if normalized.len() > MAX_TAGS {
        return Err(NoteError::TooManyTags);
    }
    Ok(normalized)
}

pub fn next_sort_order(current_max: Option<i32>) -> i32 {
    current_max.map_or(0, |max| max.saturating_add(1))
}

/// Computes the new dense order for a bulk reorder.
///
/// `existing` is the owner's notes in their current order. The requested ids
/// take positions `0..n`; every note not mentioned follows in its previous
/// relative order. Only notes whose position changes are returned.
pub fn plan_reorder(
    existing: &[(Uuid, i32)],
    requested: &[Uuid],
) -> Result<Vec<(Uuid, i32)>, ReorderError> {
    if requested.is_empty() {
        return Err(ReorderError::Empty);
    }

    let known: HashSet<Uuid> = existing.iter().map(|(id, _)| *id).collect();
    let mut listed = HashSet::new();
    for id in requested {
        if !known.contains(id) {
            return Err(ReorderError::Unknown(*id));
        }
        if !listed.insert(*id) {
            return Err(ReorderError::Duplicate(*id));
        }
    }

    let mut remaining: Vec<&(Uuid, i32)> = existing
        .iter()
        .filter(|(id, _)| !listed.contains(id))
        .collect();
    remaining.sort_by_key(|(_, order)| *order);

    let final_order = requested
        .iter()
        .copied()
        .chain(remaining.into_iter().map(|(id, _)| *id));

    let current: HashMap<Uuid, i32> = existing.iter().copied().collect();
    let updates = final_order
        .enumerate()
        .filter_map(|(position, id)| {
            let position = position as i32;
            (current.get(&id) != Some(&position)).then_some((id, position))
        })
        .collect();

    Ok(updates)
}
