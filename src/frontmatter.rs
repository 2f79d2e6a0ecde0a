//! Defines the [`Frontmatter`] type and the logic for splitting a post source
//! file into its YAML header and Markdown body.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;
use tracing::{debug, warn};

/// The metadata block at the head of a post. The recognized keys are typed;
/// anything else is captured in [`Frontmatter::extra`] and written back out
/// untouched when the index is snapshotted. So is a recognized key whose
/// value doesn't fit its type, e.g. `readTime: soon`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The primary publish date. Takes precedence over `publish_date` when
    /// both parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,

    /// Accepts either `tags: [a, b]` or `tags: a`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,

    /// Estimated reading time in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Keys this crate doesn't interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Frontmatter {
    /// Splits `input` into its parsed frontmatter and the remaining body. A
    /// file that doesn't open with a `---` line has no frontmatter; that's not
    /// an error and yields the default value with the whole input as the body.
    pub fn parse(input: &str) -> Result<(Frontmatter, &str)> {
        match fence_indices(input)? {
            None => Ok((Frontmatter::default(), input)),
            Some((yaml_start, yaml_stop, body_start)) => {
                let yaml = &input[yaml_start..yaml_stop];
                let frontmatter = if yaml.trim().is_empty() {
                    Frontmatter::default()
                } else {
                    match serde_yaml::from_str::<Value>(yaml)? {
                        Value::Mapping(mapping) => Frontmatter::from_mapping(mapping),
                        Value::Null => Frontmatter::default(),
                        _ => return Err(Error::NotAMapping),
                    }
                };
                Ok((frontmatter, &input[body_start..]))
            }
        }
    }

    /// Pulls the recognized keys out of `mapping` one at a time. A value that
    /// can't be converted to its field's type is kept in
    /// [`Frontmatter::extra`] under its original key and the field is left
    /// empty; it never discards the rest of the header.
    pub fn from_mapping(mut mapping: Mapping) -> Frontmatter {
        let mut extra = BTreeMap::new();
        let mut take = |key: &str| -> Option<Value> {
            mapping.remove(&Value::String(key.to_owned()))
        };

        let mut frontmatter = Frontmatter {
            title: field(&mut extra, "title", take("title"), to_text),
            description: field(&mut extra, "description", take("description"), to_text),
            date: field(&mut extra, "date", take("date"), to_text),
            publish_date: field(&mut extra, "publishDate", take("publishDate"), to_text),
            tags: field(&mut extra, "tags", take("tags"), to_tags).unwrap_or_default(),
            cover_image: field(&mut extra, "coverImage", take("coverImage"), to_text),
            word_count: field(&mut extra, "wordCount", take("wordCount"), to_count),
            read_time: field(&mut extra, "readTime", take("readTime"), to_minutes),
            views: field(&mut extra, "views", take("views"), to_count),
            location: field(&mut extra, "location", take("location"), to_text),
            comments: field(&mut extra, "comments", take("comments"), to_count),
            author: field(&mut extra, "author", take("author"), to_text),
            category: field(&mut extra, "category", take("category"), to_text),
            extra: BTreeMap::new(),
        };

        for (key, value) in mapping {
            match to_text(&key) {
                Some(key) => {
                    extra.insert(key, value);
                }
                None => debug!(key = ?key, "Skipping non-scalar frontmatter key"),
            }
        }
        frontmatter.extra = extra;
        frontmatter
    }

    /// Like [`Frontmatter::parse`], but a malformed header degrades to
    /// [`Frontmatter::default`] instead of failing. `source` is only used for
    /// the log line.
    pub fn parse_lenient<'a>(source: &str, input: &'a str) -> (Frontmatter, &'a str) {
        match Frontmatter::parse(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(source, error = %e, "Malformed frontmatter, using empty metadata");
                let body = match fence_indices(input) {
                    Ok(Some((_, _, body_start))) => &input[body_start..],
                    _ => input,
                };
                (Frontmatter::default(), body)
            }
        }
    }

    /// The effective publish date string: `date`, falling back to
    /// `publish_date`. Blank values count as missing.
    pub fn date_str(&self) -> Option<&str> {
        fn non_blank(s: &Option<String>) -> Option<&str> {
            s.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        non_blank(&self.date).or_else(|| non_blank(&self.publish_date))
    }
}

const FENCE: &str = "---";

/// Returns `(yaml_start, yaml_stop, body_start)` byte offsets when `input`
/// opens with a fence line. The closing fence must sit on its own line.
fn fence_indices(input: &str) -> Result<Option<(usize, usize, usize)>> {
    let input_start = if input.starts_with('\u{feff}') { 3 } else { 0 };
    let rest = &input[input_start..];
    let first_line = rest.lines().next().unwrap_or("");
    if first_line.trim_end() != FENCE {
        return Ok(None);
    }

    let yaml_start = input_start + first_line.len() + line_break_len(&rest[first_line.len()..]);
    let mut offset = yaml_start;
    for line in input[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok(Some((yaml_start, offset, offset + line.len())));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

fn line_break_len(s: &str) -> usize {
    if s.starts_with("\r\n") {
        2
    } else if s.starts_with('\n') {
        1
    } else {
        0
    }
}

/// Converts `value` with `convert`. A null is an absent field; anything
/// `convert` rejects is parked in `extra` under `key`.
fn field<T>(
    extra: &mut BTreeMap<String, Value>,
    key: &str,
    value: Option<Value>,
    convert: fn(&Value) -> Option<T>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => match convert(&value) {
            Some(converted) => Some(converted),
            None => {
                debug!(key, value = ?value, "Frontmatter value has an unexpected type");
                extra.insert(key.to_owned(), value);
                None
            }
        },
    }
}

/// Any scalar, as text. `2024-01-01` and `42` both come back as strings.
fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A non-negative count. Fractions are rounded and numeric strings are
/// accepted.
fn to_count(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => match n.as_u64() {
            Some(n) => return Some(n),
            None => n.as_f64()?,
        },
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() && n >= 0.0 && n <= u64::MAX as f64 {
        Some(n.round() as u64)
    } else {
        None
    }
}

fn to_minutes(value: &Value) -> Option<u32> {
    to_count(value).and_then(|n| u32::try_from(n).ok())
}

/// `tags: a` or `tags: [a, b]`.
fn to_tags(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Sequence(items) => items.iter().map(to_text).collect(),
        scalar => to_text(scalar).map(|tag| vec![tag]),
    }
}

/// Represents the result of a [`Frontmatter`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Frontmatter`] header.
#[derive(Debug)]
pub enum Error {
    /// Returned when the opening `---` was found but the closing one was not.
    MissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the header is valid YAML but not a key/value mapping.
    NotAMapping,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingEndFence => write!(f, "Missing closing `---`"),
            Error::DeserializeYaml(err) => fmt::Display::fmt(err, f),
            Error::NotAMapping => write!(f, "Frontmatter is not a key/value mapping"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::NotAMapping => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
