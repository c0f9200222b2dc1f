use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::frontmatter::{self, FrontmatterError};
use crate::slug::{decode_id, title_from_slug};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    Feat,
    Todo,
    Bug,
    Refact,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Feat => "feat",
            IssueType::Todo => "todo",
            IssueType::Bug => "bug",
            IssueType::Refact => "refact",
        }
    }

    pub fn all() -> [IssueType; 4] {
        [
            IssueType::Feat,
            IssueType::Todo,
            IssueType::Bug,
            IssueType::Refact,
        ]
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown issue type: {0}")]
pub struct ParseIssueTypeError(String);

impl FromStr for IssueType {
    type Err = ParseIssueTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "feat" => Ok(IssueType::Feat),
            "todo" => Ok(IssueType::Todo),
            "bug" => Ok(IssueType::Bug),
            "refact" => Ok(IssueType::Refact),
            other => Err(ParseIssueTypeError(other.to_string())),
        }
    }
}

/// Lifecycle position. `Achieved` is terminal; there is no way back to
/// `Stash` once an issue has been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Stash,
    Doing,
    Achieved,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Stash => "stash",
            Stage::Doing => "doing",
            Stage::Achieved => "achieved",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub title: String,
    pub number: u32,
    pub kind: IssueType,
    pub content: String,
    pub create_date: NaiveDate,
    pub stage: Stage,
    pub file_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Failed to read issue file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid issue metadata in {path}: {source}")]
    InvalidMetadata {
        path: PathBuf,
        source: FrontmatterError,
    },
}

/// Parse an issue file. The stage is structural, inferred by the caller from
/// the directory the path lives under, never from file content.
///
/// Files with no front matter at all load with defaults (todo, today, id from
/// the filename) so a hand-created stash note is still usable. Front matter
/// that is present but malformed is an error.
pub fn load_issue(path: &Path, stage: Stage) -> Result<Issue, IssueError> {
    let text = fs::read_to_string(path).map_err(|source| IssueError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (metadata, body) =
        frontmatter::decode(&text).map_err(|source| IssueError::InvalidMetadata {
            path: path.to_path_buf(),
            source,
        })?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let filename_id = decode_id(&filename);

    let (number, kind, create_date) = match metadata {
        Some(meta) => (meta.index, meta.kind, meta.create_date),
        None => (
            filename_id.unwrap_or(0),
            IssueType::Todo,
            Local::now().date_naive(),
        ),
    };

    Ok(Issue {
        title: title_from_filename(&filename),
        number,
        kind,
        content: body,
        create_date,
        stage,
        file_path: path.to_path_buf(),
    })
}

/// Recover a display title from an issue filename, dropping the `.md`
/// extension and, for active files, the embedded id.
pub fn title_from_filename(filename: &str) -> String {
    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    let stem = if crate::slug::is_active_filename(filename) {
        match stem.rfind('.') {
            Some(idx) => &stem[..idx],
            None => stem,
        }
    } else {
        stem
    };
    title_from_slug(stem)
}

pub fn issues_to_json(issues: &[Issue]) -> String {
    let payload: Vec<serde_json::Value> = issues.iter().map(issue_to_json_value).collect();
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "[]".to_string())
}

pub fn issue_to_json_value(issue: &Issue) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(
        "number".to_string(),
        serde_json::Value::Number(issue.number.into()),
    );
    map.insert(
        "title".to_string(),
        serde_json::Value::String(issue.title.clone()),
    );
    map.insert(
        "type".to_string(),
        serde_json::Value::String(issue.kind.as_str().to_string()),
    );
    map.insert(
        "stage".to_string(),
        serde_json::Value::String(issue.stage.as_str().to_string()),
    );
    map.insert(
        "create_date".to_string(),
        serde_json::Value::String(issue.create_date.format("%Y-%m-%d").to_string()),
    );
    map.insert(
        "path".to_string(),
        issue
            .file_path
            .to_str()
            .map(|path| serde_json::Value::String(path.to_string()))
            .unwrap_or(serde_json::Value::Null),
    );
    serde_json::Value::Object(map)
}
