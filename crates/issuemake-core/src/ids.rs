use std::fs;
use std::path::Path;

use crate::slug::decode_id;

/// Next id for a snapshot of active filenames: max(embedded ids) + 1, or 0
/// when no active file exists. Pure so it can be tested without touching disk.
pub fn next_id<I>(filenames: I) -> u32
where
    I: IntoIterator<Item = String>,
{
    filenames
        .into_iter()
        .filter_map(|name| decode_id(&name))
        .max()
        .map(|id| id + 1)
        .unwrap_or(0)
}

/// Allocate the next id by listing the stash and doing directories. A missing
/// directory counts as empty. Nothing reserves the id; the caller is expected
/// to write the issue file promptly. Two interleaved allocations can collide,
/// which is an accepted limitation of the single-user design.
pub fn allocate_id(stash_dir: &Path, doing_dir: &Path) -> std::io::Result<u32> {
    let mut names = list_filenames(stash_dir)?;
    names.extend(list_filenames(doing_dir)?);
    Ok(next_id(names))
}

fn list_filenames(dir: &Path) -> std::io::Result<Vec<String>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}
