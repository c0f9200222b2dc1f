use regex::Regex;

const MAX_SLUG_LEN: usize = 80;

/// Characters that are unsafe in filenames on at least one supported platform.
const UNSAFE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars() {
        if ch.is_whitespace() {
            pending_hyphen = !out.is_empty();
            continue;
        }
        if pending_hyphen {
            out.push('-');
            pending_hyphen = false;
        }
        if UNSAFE_CHARS.contains(&ch) {
            out.push('_');
        } else {
            out.push(ch);
        }
    }

    let out = collapse_repeats(&out, '_');
    let out = collapse_repeats(&out, '-');
    let out = out.trim_matches('-');
    let out: String = out.chars().take(MAX_SLUG_LEN).collect();

    if out.chars().any(|ch| ch.is_alphanumeric()) {
        out
    } else {
        "untitled".to_string()
    }
}

fn collapse_repeats(text: &str, target: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_target = false;
    for ch in text.chars() {
        if ch == target {
            if last_was_target {
                continue;
            }
            last_was_target = true;
        } else {
            last_was_target = false;
        }
        out.push(ch);
    }
    out
}

/// Filename for an issue still carrying its id (stash and doing stages).
pub fn encode_active(title: &str, id: u32) -> String {
    format!("{}.{}.md", sanitize_title(title), id)
}

/// Filename for an archived issue; the id is retired and dropped.
pub fn encode_archived(title: &str) -> String {
    format!("{}.md", sanitize_title(title))
}

fn id_suffix_regex() -> Regex {
    Regex::new(r"\.(\d+)\.md$").expect("regex")
}

/// Extract the id embedded in an active filename. Only the rightmost
/// `.{digits}.md` suffix counts; digits elsewhere in the slug are ignored.
pub fn decode_id(filename: &str) -> Option<u32> {
    id_suffix_regex()
        .captures(filename)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

pub fn is_active_filename(filename: &str) -> bool {
    id_suffix_regex().is_match(filename)
}

/// Best-effort title recovered from a slug, for display and fuzzy search.
pub fn title_from_slug(slug: &str) -> String {
    slug.replace(['-', '_'], " ").trim().to_string()
}
