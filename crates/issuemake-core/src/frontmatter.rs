use chrono::NaiveDate;
use serde_yaml::Value;
use thiserror::Error;

use crate::issue::IssueType;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("Missing closing --- for front matter")]
    MissingEnd,
    #[error("Failed to parse front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Front matter is not a key/value mapping")]
    NotAMapping,
    #[error("Missing front matter field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueMetadata {
    pub create_date: NaiveDate,
    pub kind: IssueType,
    pub index: u32,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode(metadata: &IssueMetadata, body: &str) -> String {
    format!(
        "---\nCreate Date: {}\nType: {}\nIndex: {}\n---\n\n{}",
        metadata.create_date.format(DATE_FORMAT),
        metadata.kind.as_str(),
        metadata.index,
        body
    )
}

/// Decode an issue file. When the leading delimiter is absent the whole text
/// is treated as body with no metadata, so hand-edited files still load. A
/// present-but-malformed front matter block is an error, never silently
/// degraded.
pub fn decode(text: &str) -> Result<(Option<IssueMetadata>, String), FrontmatterError> {
    if !has_leading_delimiter(text) {
        return Ok((None, text.to_string()));
    }
    let (front, body) = split_front_matter(text)?;
    let metadata = parse_metadata(&front)?;
    Ok((Some(metadata), body))
}

pub fn has_leading_delimiter(text: &str) -> bool {
    text.lines().next().map(|line| line.trim() == "---").unwrap_or(false)
}

/// Split text with a leading `---` line into (front matter, body). The body
/// keeps its bytes verbatim apart from the single blank line `encode` emits
/// after the closing delimiter.
pub fn split_front_matter(text: &str) -> Result<(String, String), FrontmatterError> {
    let front_start = match text.find('\n') {
        Some(idx) => idx + 1,
        None => return Err(FrontmatterError::MissingEnd),
    };
    let mut pos = front_start;
    loop {
        let line_end = text[pos..].find('\n').map(|idx| pos + idx);
        let line = match line_end {
            Some(end) => &text[pos..end],
            None => &text[pos..],
        };
        if line.trim() == "---" {
            let front = text[front_start..pos].trim_end_matches('\n').to_string();
            let body_start = line_end.map(|end| end + 1).unwrap_or(text.len());
            let body = &text[body_start..];
            let body = body.strip_prefix('\n').unwrap_or(body);
            return Ok((front, body.to_string()));
        }
        match line_end {
            Some(end) => pos = end + 1,
            None => return Err(FrontmatterError::MissingEnd),
        }
    }
}

fn parse_metadata(front: &str) -> Result<IssueMetadata, FrontmatterError> {
    let value: Value = serde_yaml::from_str(front)?;
    let Value::Mapping(map) = value else {
        return Err(FrontmatterError::NotAMapping);
    };
    let get = |key: &str| map.get(&Value::String(key.to_string())).cloned();

    let date_raw = scalar_string(get("Create Date"))
        .ok_or(FrontmatterError::MissingField("Create Date"))?;
    let create_date = NaiveDate::parse_from_str(date_raw.trim(), DATE_FORMAT).map_err(|_| {
        FrontmatterError::InvalidValue {
            field: "Create Date",
            value: date_raw.clone(),
        }
    })?;

    let kind_raw =
        scalar_string(get("Type")).ok_or(FrontmatterError::MissingField("Type"))?;
    let kind = kind_raw
        .trim()
        .parse::<IssueType>()
        .map_err(|_| FrontmatterError::InvalidValue {
            field: "Type",
            value: kind_raw.clone(),
        })?;

    let index_raw =
        scalar_string(get("Index")).ok_or(FrontmatterError::MissingField("Index"))?;
    let index = index_raw
        .trim()
        .parse::<u32>()
        .map_err(|_| FrontmatterError::InvalidValue {
            field: "Index",
            value: index_raw.clone(),
        })?;

    Ok(IssueMetadata {
        create_date,
        kind,
        index,
    })
}

fn scalar_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(val)) => Some(val),
        Some(Value::Number(num)) => Some(num.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metadata() -> IssueMetadata {
        IssueMetadata {
            create_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            kind: IssueType::Feat,
            index: 7,
        }
    }

    #[test]
    fn encode_renders_delimited_block() {
        let text = encode(&metadata(), "body text");
        assert_eq!(
            text,
            "---\nCreate Date: 2026-03-14\nType: feat\nIndex: 7\n---\n\nbody text"
        );
    }

    #[test]
    fn decode_round_trips_encode() {
        let body = "First line\n\nSecond paragraph\n";
        let text = encode(&metadata(), body);
        let (parsed, parsed_body) = decode(&text).expect("decode");
        assert_eq!(parsed, Some(metadata()));
        assert_eq!(parsed_body, body);
    }

    #[test]
    fn decode_round_trips_empty_body() {
        let text = encode(&metadata(), "");
        let (parsed, body) = decode(&text).expect("decode");
        assert_eq!(parsed, Some(metadata()));
        assert_eq!(body, "");
    }

    #[test]
    fn decode_without_delimiter_is_all_body() {
        let (parsed, body) = decode("plain notes, no metadata").expect("decode");
        assert_eq!(parsed, None);
        assert_eq!(body, "plain notes, no metadata");
    }

    #[test]
    fn decode_rejects_unterminated_front_matter() {
        let err = decode("---\nType: feat\n");
        assert!(matches!(err, Err(FrontmatterError::MissingEnd)));
    }

    #[test]
    fn decode_rejects_missing_fields() {
        let err = decode("---\nType: feat\nIndex: 1\n---\n\nbody");
        assert!(matches!(
            err,
            Err(FrontmatterError::MissingField("Create Date"))
        ));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let err = decode("---\nCreate Date: 2026-03-14\nType: chore\nIndex: 1\n---\n\nbody");
        assert!(matches!(
            err,
            Err(FrontmatterError::InvalidValue { field: "Type", .. })
        ));
    }

    #[test]
    fn decode_rejects_bad_date() {
        let err = decode("---\nCreate Date: 14/03/2026\nType: bug\nIndex: 1\n---\n\nbody");
        assert!(matches!(
            err,
            Err(FrontmatterError::InvalidValue {
                field: "Create Date",
                ..
            })
        ));
    }
}
