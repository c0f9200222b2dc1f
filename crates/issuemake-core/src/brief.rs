use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::issue::Issue;

pub const BLOCK_START: &str = "<!-- ISSUE-MAKE:START -->";
pub const BLOCK_END: &str = "<!-- ISSUE-MAKE:END -->";

const DEFAULT_HEADER: &str = "# Agents Brief\n\n";

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("Failed to update brief: {0}")]
    Io(#[from] std::io::Error),
    #[error("Brief does not exist at {0}; nothing was ever published")]
    Missing(PathBuf),
}

/// Remove every marker-delimited task block from the document, each with one
/// trailing newline. Text between the markers is never interpreted, so a
/// block whose description happens to contain marker-looking prose inside is
/// still removed as a unit up to the first end marker.
pub fn strip_task_block(text: &str) -> String {
    let pattern = format!(
        "(?s){}.*?{}\n?",
        regex::escape(BLOCK_START),
        regex::escape(BLOCK_END)
    );
    let re = Regex::new(&pattern).expect("regex");
    re.replace_all(text, "").into_owned()
}

pub fn render_task_block(issue: &Issue, solution_path: &Path) -> String {
    format!(
        "{start}\n\
         ## Task: {title}\n\
         Issue ID: {number}\n\
         Type: {kind}\n\
         Created: {date}\n\
         ### Description\n\
         {content}\n\
         ### Instructions\n\
         - Work on the task described above.\n\
         - When finished, write the full solution into `{solution}`.\n\
         {end}",
        start = BLOCK_START,
        title = issue.title,
        number = issue.number,
        kind = issue.kind,
        date = issue.create_date.format("%Y-%m-%d"),
        content = issue.content.trim_end(),
        solution = solution_path.display(),
        end = BLOCK_END,
    )
}

/// Publish the issue into the brief. A missing brief is treated as an empty
/// document with the default header. Any previous block is stripped first, so
/// repeated calls leave exactly one block.
pub fn publish(brief_path: &Path, issue: &Issue, solution_path: &Path) -> Result<(), BriefError> {
    let text = match fs::read_to_string(brief_path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => DEFAULT_HEADER.to_string(),
        Err(err) => return Err(err.into()),
    };
    let mut doc = strip_task_block(&text);
    if !doc.is_empty() && !doc.ends_with('\n') {
        doc.push('\n');
    }
    doc.push_str(&render_task_block(issue, solution_path));
    doc.push('\n');
    fs::write(brief_path, doc)?;
    Ok(())
}

/// Remove the task block from the brief. A missing brief is an error here: a
/// prior publish is a precondition for any retract, so there is no valid
/// "nothing to do" reading of an absent file.
pub fn retract(brief_path: &Path) -> Result<(), BriefError> {
    if !brief_path.is_file() {
        return Err(BriefError::Missing(brief_path.to_path_buf()));
    }
    let text = fs::read_to_string(brief_path)?;
    let doc = strip_task_block(&text);
    fs::write(brief_path, doc)?;
    Ok(())
}
