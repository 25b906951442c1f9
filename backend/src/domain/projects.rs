use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Concept,
    Development,
    Review,
    Published,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Concept,
        ProjectStatus::Development,
        ProjectStatus::Review,
        ProjectStatus::Published,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Concept => "concept",
            ProjectStatus::Development => "development",
            ProjectStatus::Review => "review",
            ProjectStatus::Published => "published",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ProjectError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ProjectError::UnknownStatus(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Single,
    Ep,
    Album,
    Mixtape,
    MusicVideo,
    Other,
}

impl ProjectType {
    pub const ALL: [ProjectType; 6] = [
        ProjectType::Single,
        ProjectType::Ep,
        ProjectType::Album,
        ProjectType::Mixtape,
        ProjectType::MusicVideo,
        ProjectType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Single => "single",
            ProjectType::Ep => "ep",
            ProjectType::Album => "album",
            ProjectType::Mixtape => "mixtape",
            ProjectType::MusicVideo => "music_video",
            ProjectType::Other => "other",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = ProjectError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProjectType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == value)
            .ok_or_else(|| ProjectError::UnknownType(value.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most 255 characters")]
    TitleTooLong,
    #[error("unknown project status: {0}")]
    UnknownStatus(String),
    #[error("unknown project type: {0}")]
    UnknownType(String),
    #[error("metadata must be a JSON object")]
    MetadataNotObject,
}

pub fn normalize_title(raw: &str) -> Result<String, ProjectError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProjectError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ProjectError::TitleTooLong);
    }
    Ok(trimmed.to_string())
}

/// Free-form metadata must be an object; a missing or null value becomes `{}`.
pub fn normalize_metadata(value: Option<Value>) -> Result<Value, ProjectError> {
    match value {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(Value::Object(map)) => Ok(Value::Object(map)),
        Some(_) => Err(ProjectError::MetadataNotObject),
    }
}

/// Builds an `ILIKE` substring pattern for the search box, escaping the
/// wildcard characters. Blank queries yield `None`.
pub fn title_search_pattern(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(trimmed.len() + 2);
    pattern.push('%');
    for ch in trimmed.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_status_strings() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>(), Ok(status));
        }
        assert_eq!(
            "archived".parse::<ProjectStatus>(),
            Err(ProjectError::UnknownStatus("archived".into()))
        );
        assert_eq!(ProjectStatus::default(), ProjectStatus::Concept);
    }

    #[test]
    fn serializes_types_in_snake_case() {
        assert_eq!(
            serde_json::to_value(ProjectType::MusicVideo).unwrap(),
            json!("music_video")
        );
        assert_eq!("music_video".parse::<ProjectType>(), Ok(ProjectType::MusicVideo));
    }

    #[test]
    fn validates_titles() {
        assert_eq!(normalize_title("  Night Drive "), Ok("Night Drive".into()));
        assert_eq!(normalize_title(" "), Err(ProjectError::EmptyTitle));
        assert_eq!(
            normalize_title(&"a".repeat(300)),
            Err(ProjectError::TitleTooLong)
        );
    }

    #[test]
    fn metadata_defaults_to_empty_object() {
        assert_eq!(normalize_metadata(None), Ok(json!({})));
        assert_eq!(normalize_metadata(Some(Value::Null)), Ok(json!({})));
        assert_eq!(
            normalize_metadata(Some(json!({ "bpm": 120 }))),
            Ok(json!({ "bpm": 120 }))
        );
        assert_eq!(
            normalize_metadata(Some(json!([1, 2]))),
            Err(ProjectError::MetadataNotObject)
        );
    }

    #[test]
    fn builds_escaped_search_patterns() {
        assert_eq!(title_search_pattern(" drive "), Some("%drive%".into()));
        assert_eq!(title_search_pattern("100%_"), Some("%100\\%\\_%".into()));
        assert_eq!(title_search_pattern("   "), None);
    }
}
