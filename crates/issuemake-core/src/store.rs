use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

use crate::brief::{self, BriefError};
use crate::frontmatter::{self, IssueMetadata};
use crate::ids::allocate_id;
use crate::issue::{load_issue, Issue, IssueError, IssueType, Stage};
use crate::slug::{encode_active, encode_archived, is_active_filename};

pub const ISSUES_DIR: &str = ".issues";
pub const SOLUTION_FILENAME: &str = "solution.md";
pub const BRIEF_FILENAME: &str = "AGENTS_BRIEF.md";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No issue matches '{identifier}' in stash or doing")]
    NotFound { identifier: String },
    #[error("Issue {number} is already in progress; close it first or pick another")]
    AlreadyInProgress { number: u32 },
    #[error("Issue {number} is not in progress; open it before closing")]
    NotInProgress { number: u32 },
    #[error("No solution found at {path}; write your solution to .issues/solution.md before closing")]
    SolutionMissing { path: PathBuf },
    #[error(transparent)]
    InvalidMetadata(#[from] IssueError),
    #[error("Stage transition committed but the brief update failed: {0}")]
    Brief(#[from] BriefError),
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct OpenOutcome {
    pub issue: Issue,
    pub solution_path: PathBuf,
}

#[derive(Debug)]
pub struct CloseOutcome {
    pub archived_path: PathBuf,
}

/// Issues found in one stage directory, with per-file parse failures kept
/// alongside instead of aborting the whole scan.
#[derive(Debug, Default)]
pub struct StageScan {
    pub issues: Vec<Issue>,
    pub malformed: Vec<(PathBuf, IssueError)>,
}

/// Owner of the `.issues` directory tree. All operations are synchronous and
/// best-effort sequential: nothing here guards against a second process
/// mutating the tree at the same time, and the multi-step `open`/`close`
/// sequences are not transactional.
#[derive(Debug, Clone)]
pub struct IssueStore {
    root: PathBuf,
}

impl IssueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn issues_dir(&self) -> PathBuf {
        self.root.join(ISSUES_DIR)
    }

    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.issues_dir().join(stage.as_str())
    }

    pub fn solution_path(&self) -> PathBuf {
        self.issues_dir().join(SOLUTION_FILENAME)
    }

    pub fn brief_path(&self) -> PathBuf {
        self.root.join(BRIEF_FILENAME)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        for stage in [Stage::Stash, Stage::Doing, Stage::Achieved] {
            fs::create_dir_all(self.stage_dir(stage))?;
        }
        Ok(())
    }

    /// Create a new issue in the stash. The id comes from a directory scan;
    /// nothing reserves it between allocation and the write below.
    pub fn create(
        &self,
        title: &str,
        kind: IssueType,
        content: &str,
    ) -> Result<Issue, StoreError> {
        self.ensure_dirs()?;
        let number = allocate_id(&self.stage_dir(Stage::Stash), &self.stage_dir(Stage::Doing))?;
        let create_date = Local::now().date_naive();
        let metadata = IssueMetadata {
            create_date,
            kind,
            index: number,
        };
        let path = self.stage_dir(Stage::Stash).join(encode_active(title, number));
        fs::write(&path, frontmatter::encode(&metadata, content))?;

        Ok(Issue {
            title: title.to_string(),
            number,
            kind,
            content: content.to_string(),
            create_date,
            stage: Stage::Stash,
            file_path: path,
        })
    }

    /// Resolve an identifier to an issue in stash or doing. A numeric
    /// identifier resolves by id, anything else by fuzzy title match.
    /// Absence is an ordinary outcome, not an error.
    pub fn find(&self, identifier: &str) -> Result<Option<Issue>, StoreError> {
        match identifier.trim().parse::<u32>() {
            Ok(number) => self.find_by_number(number),
            Err(_) => self.find_by_title(identifier),
        }
    }

    pub fn find_by_number(&self, number: u32) -> Result<Option<Issue>, StoreError> {
        for stage in [Stage::Stash, Stage::Doing] {
            let scan = self.scan_stage(stage)?;
            if let Some(issue) = scan.issues.into_iter().find(|issue| issue.number == number) {
                return Ok(Some(issue));
            }
        }
        Ok(None)
    }

    /// Fuzzy title lookup: bidirectional substring containment over
    /// normalized titles. Stash is scanned before doing; within a stage the
    /// lowest id wins, so the result does not depend on directory listing
    /// order.
    pub fn find_by_title(&self, query: &str) -> Result<Option<Issue>, StoreError> {
        let needle = normalize_for_search(query);
        if needle.is_empty() {
            return Ok(None);
        }
        for stage in [Stage::Stash, Stage::Doing] {
            let scan = self.scan_stage(stage)?;
            let matched = scan
                .issues
                .into_iter()
                .filter(|issue| titles_match(&needle, &normalize_for_search(&issue.title)))
                .min_by_key(|issue| issue.number);
            if let Some(issue) = matched {
                return Ok(Some(issue));
            }
        }
        Ok(None)
    }

    /// Parse every active issue file in a stage directory. Malformed files
    /// are reported per-file in the scan result rather than aborting the
    /// scan.
    pub fn scan_stage(&self, stage: Stage) -> Result<StageScan, StoreError> {
        let dir = self.stage_dir(stage);
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StageScan::default())
            }
            Err(err) => return Err(err.into()),
        };

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(is_active_filename)
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut scan = StageScan::default();
        for path in paths {
            match load_issue(&path, stage) {
                Ok(issue) => scan.issues.push(issue),
                Err(err) => scan.malformed.push((path, err)),
            }
        }
        scan.issues.sort_by_key(|issue| issue.number);
        Ok(scan)
    }

    /// All active issues, stash then doing, each stage ordered by id.
    pub fn list(&self) -> Result<Vec<Issue>, StoreError> {
        let mut issues = Vec::new();
        for stage in [Stage::Stash, Stage::Doing] {
            issues.extend(self.scan_stage(stage)?.issues);
        }
        Ok(issues)
    }

    /// Move an issue into `doing`, seed the solution file, and publish the
    /// brief. If the brief update fails the move has already committed; the
    /// error variant makes that state distinguishable for the caller.
    pub fn open(&self, identifier: &str) -> Result<OpenOutcome, StoreError> {
        let issue = self
            .find(identifier)?
            .ok_or_else(|| StoreError::NotFound {
                identifier: identifier.to_string(),
            })?;
        if issue.stage == Stage::Doing {
            return Err(StoreError::AlreadyInProgress {
                number: issue.number,
            });
        }

        self.ensure_dirs()?;
        let target = self
            .stage_dir(Stage::Doing)
            .join(encode_active(&issue.title, issue.number));
        fs::rename(&issue.file_path, &target)?;

        let moved = Issue {
            stage: Stage::Doing,
            file_path: target,
            ..issue
        };

        let solution_path = self.solution_path();
        fs::write(&solution_path, solution_seed(&moved))?;
        brief::publish(&self.brief_path(), &moved, &solution_path)?;

        Ok(OpenOutcome {
            issue: moved,
            solution_path,
        })
    }

    /// Archive a doing-stage issue, folding the solution text into the
    /// archived body. Requires the solution file to exist; until every step
    /// has run the doing file and solution stay on disk, so a failed close
    /// can simply be retried.
    pub fn close(&self, identifier: &str) -> Result<CloseOutcome, StoreError> {
        let issue = self
            .find(identifier)?
            .ok_or_else(|| StoreError::NotFound {
                identifier: identifier.to_string(),
            })?;
        if issue.stage != Stage::Doing {
            return Err(StoreError::NotInProgress {
                number: issue.number,
            });
        }

        let solution_path = self.solution_path();
        if !solution_path.is_file() {
            return Err(StoreError::SolutionMissing {
                path: solution_path,
            });
        }
        let solution = fs::read_to_string(&solution_path)?;

        self.ensure_dirs()?;
        let archived_path = self.archive_target(&issue.title);
        fs::write(&archived_path, archived_body(&issue.content, &solution))?;
        fs::remove_file(&issue.file_path)?;
        fs::remove_file(&solution_path)?;
        brief::retract(&self.brief_path())?;

        Ok(CloseOutcome { archived_path })
    }

    /// Archived filenames drop the id, so two issues with the same slug
    /// would collide. Suffix the slug with a counter instead of overwriting
    /// an earlier archive.
    fn archive_target(&self, title: &str) -> PathBuf {
        let dir = self.stage_dir(Stage::Achieved);
        let filename = encode_archived(title);
        let candidate = dir.join(&filename);
        if !candidate.exists() {
            return candidate;
        }
        let stem = filename.strip_suffix(".md").unwrap_or(&filename);
        let mut counter = 2u32;
        loop {
            let candidate = dir.join(format!("{}-{}.md", stem, counter));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Infer the stage of a path from which stage directory contains it.
    pub fn stage_of_path(&self, path: &Path) -> Option<Stage> {
        let parent = path.parent()?;
        [Stage::Stash, Stage::Doing, Stage::Achieved]
            .into_iter()
            .find(|stage| parent == self.stage_dir(*stage))
    }

    pub fn load_from_path(&self, path: &Path) -> Result<Issue, StoreError> {
        let stage = self
            .stage_of_path(path)
            .ok_or_else(|| StoreError::NotFound {
                identifier: path.display().to_string(),
            })?;
        Ok(load_issue(path, stage)?)
    }
}

fn solution_seed(issue: &Issue) -> String {
    format!(
        "# Solution: {} (issue {})\n\nWrite the solution for this task here.\n",
        issue.title, issue.number
    )
}

// The original description is spliced verbatim; only the solution side is
// normalized.
fn archived_body(content: &str, solution: &str) -> String {
    format!("{}\n\n---\n\n## Solution\n\n{}\n", content, solution.trim_end())
}

/// Normalization applied to both sides of a fuzzy title comparison:
/// lowercase, separators to spaces, punctuation dropped, whitespace
/// collapsed.
pub fn normalize_for_search(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for ch in lowered.chars() {
        let ch = match ch {
            '-' | '_' => ' ',
            other => other,
        };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if !ch.is_alphanumeric() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

fn titles_match(needle: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    candidate.contains(needle) || needle.contains(candidate)
}
