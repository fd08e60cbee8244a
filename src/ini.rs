//! Flat ini codec shared by profile files and the npm user config.
//!
//! Only the subset npm writes to `~/.npmrc` is understood: one `key = value`
//! pair per line, repeated `key[] = value` lines forming a list, `;`/`#`
//! comments, bare keys meaning `true`, and JSON-quoted values. Section
//! headers are rejected.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

/// Suffix marking a key whose lines accumulate into a list
const LIST_SUFFIX: &str = "[]";

/// A value stored under an ini key
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IniValue {
    Bool(bool),
    Str(String),
    /// Items of repeated `key[] = item` lines, in file order
    List(Vec<String>),
}

/// Flat mapping of ini keys to values
pub type IniRecord = BTreeMap<String, IniValue>;

impl IniValue {
    /// String content, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IniValue::Str(value) => Some(value),
            IniValue::Bool(_) | IniValue::List(_) => None,
        }
    }

    /// Boolean content, accepting the strings `true` and `false` too
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            IniValue::Bool(value) => Some(*value),
            IniValue::Str(value) => match value.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            IniValue::List(_) => None,
        }
    }
}

impl From<&str> for IniValue {
    fn from(value: &str) -> Self {
        IniValue::Str(value.to_string())
    }
}

impl From<String> for IniValue {
    fn from(value: String) -> Self {
        IniValue::Str(value)
    }
}

impl From<bool> for IniValue {
    fn from(value: bool) -> Self {
        IniValue::Bool(value)
    }
}

impl fmt::Display for IniValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IniValue::Bool(value) => write!(f, "{value}"),
            IniValue::Str(value) => f.write_str(value),
            IniValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Parses ini text into a record
///
/// # Arguments
/// * `content` - Text of the ini file
/// * `path` - File the text came from, used in error messages
pub fn parse(content: &str, path: &Path) -> Result<IniRecord, AppError> {
    let mut record = IniRecord::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        let parse_error = |message: &str| AppError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            message: message.to_string(),
        };

        if line.starts_with('[') && line.ends_with(']') {
            return Err(parse_error("sections are not supported"));
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), parse_value(value.trim())),
            None => (line, IniValue::Bool(true)),
        };

        if let Some(list_key) = key.strip_suffix(LIST_SUFFIX) {
            if list_key.is_empty() {
                return Err(parse_error("missing key before '[]'"));
            }
            let item = value.to_string();
            match record.get_mut(list_key) {
                Some(IniValue::List(items)) => items.push(item),
                _ => {
                    record.insert(list_key.to_string(), IniValue::List(vec![item]));
                }
            }
            continue;
        }

        if key.is_empty() {
            return Err(parse_error("missing key before '='"));
        }

        record.insert(key.to_string(), value);
    }

    Ok(record)
}

fn parse_value(value: &str) -> IniValue {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let unquoted = serde_json::from_str::<String>(value)
            .unwrap_or_else(|_| value[1..value.len() - 1].to_string());
        return IniValue::Str(unquoted);
    }

    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return IniValue::Str(value[1..value.len() - 1].to_string());
    }

    let value = strip_inline_comment(value);
    match value.as_str() {
        "true" => IniValue::Bool(true),
        "false" => IniValue::Bool(false),
        _ => IniValue::Str(value),
    }
}

/// Cuts an unquoted value at the first unescaped `;` or `#`
///
/// `\;`, `\#` and `\\` stand for the literal character; any other backslash
/// is kept as is.
fn strip_inline_comment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            if !matches!(c, '\\' | ';' | '#') {
                out.push('\\');
            }
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ';' | '#' => break,
            _ => out.push(c),
        }
    }
    if escaped {
        out.push('\\');
    }
    out.trim_end().to_string()
}

/// Serializes a record into ini text, one key per line
///
/// Lists are written as one `key[] = item` line per item.
pub fn stringify(record: &IniRecord) -> Result<String, AppError> {
    let mut out = String::new();
    for (key, value) in record {
        match value {
            IniValue::Bool(flag) => out.push_str(&format!("{key} = {flag}\n")),
            IniValue::Str(text) => out.push_str(&format!("{key} = {}\n", render(text)?)),
            IniValue::List(items) => {
                for item in items {
                    out.push_str(&format!("{key}{LIST_SUFFIX} = {}\n", render(item)?));
                }
            }
        }
    }
    Ok(out)
}

fn render(text: &str) -> Result<String, AppError> {
    if needs_quotes(text) {
        Ok(serde_json::to_string(text)?)
    } else {
        Ok(text.to_string())
    }
}

fn needs_quotes(text: &str) -> bool {
    text != text.trim()
        || text == "true"
        || text == "false"
        || text.starts_with('\'')
        || text.contains(['"', ';', '#'])
        || text.contains(char::is_control)
        || text.contains("\\\\")
}

/// Reads and parses an ini file
pub fn read_file(path: &Path) -> Result<IniRecord, AppError> {
    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), "loaded ini file");
    parse(&content, path)
}

/// Writes a record to an ini file, replacing the whole file
///
/// The content is written to a sibling temporary file first and renamed into
/// place, so readers never observe a partially written file.
pub fn write_file(path: &Path, record: &IniRecord) -> Result<(), AppError> {
    let tmp_path = temporary_sibling(path);
    fs::write(&tmp_path, stringify(record)?)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    debug!(path = %path.display(), keys = record.len(), "stored ini file");
    Ok(())
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(content: &str) -> IniRecord {
        parse(content, Path::new("test.ini")).unwrap()
    }

    #[test]
    fn parses_scalars_and_booleans() {
        let record = parse_str(
            "registry = http://private/registry\nstrict-ssl=false\nalways-auth = true\n",
        );
        assert_eq!(record["registry"], IniValue::from("http://private/registry"));
        assert_eq!(record["strict-ssl"], IniValue::Bool(false));
        assert_eq!(record["always-auth"], IniValue::Bool(true));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let record = parse_str("; comment\n# another\n\nemail = user@example.com\n");
        assert_eq!(record.len(), 1);
        assert_eq!(record["email"].as_str(), Some("user@example.com"));
    }

    #[test]
    fn bare_key_means_true() {
        let record = parse_str("always-auth\n");
        assert_eq!(record["always-auth"], IniValue::Bool(true));
    }

    #[test]
    fn unquotes_json_strings() {
        let record = parse_str("init-author-name = \"Jane \\\"JD\\\" Doe\"\nother = 'x; y'\n");
        assert_eq!(record["init-author-name"].as_str(), Some("Jane \"JD\" Doe"));
        assert_eq!(record["other"].as_str(), Some("x; y"));
    }

    #[test]
    fn keeps_scoped_keys_with_colons_and_slashes() {
        let record = parse_str("//registry.npmjs.org/:_authToken = abc\n");
        assert_eq!(record["//registry.npmjs.org/:_authToken"].as_str(), Some("abc"));
    }

    #[test]
    fn rejects_sections_and_missing_keys() {
        let err = parse("[section]\nkey = value\n", Path::new("a.ini")).unwrap_err();
        assert!(matches!(err, AppError::Parse { line: 1, .. }));

        let err = parse("ok = 1\n= value\n", Path::new("a.ini")).unwrap_err();
        assert!(matches!(err, AppError::Parse { line: 2, .. }));
    }

    #[test]
    fn quotes_strings_that_would_not_read_back() {
        let mut record = IniRecord::new();
        record.insert("a".to_string(), IniValue::from("true"));
        record.insert("b".to_string(), IniValue::from("x # y"));
        record.insert("c".to_string(), IniValue::from("plain"));

        let text = stringify(&record).unwrap();
        assert_eq!(text, "a = \"true\"\nb = \"x # y\"\nc = plain\n");
        assert_eq!(parse_str(&text), record);
    }

    #[test]
    fn write_file_replaces_content_without_leaving_temporaries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        fs::write(&path, "old = value\n").unwrap();

        let mut record = IniRecord::new();
        record.insert("registry".to_string(), IniValue::from("http://r/"));
        write_file(&path, &record).unwrap();

        assert_eq!(read_file(&path).unwrap(), record);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn as_bool_accepts_boolean_strings() {
        assert_eq!(IniValue::from("true").as_bool(), Some(true));
        assert_eq!(IniValue::from("yes").as_bool(), None);
        assert_eq!(IniValue::Bool(false).as_bool(), Some(false));
    }

    #[test]
    fn repeated_list_keys_keep_every_item() {
        let text = "ca[] = CERT-ONE\nca[] = CERT-TWO\nregistry = http://r/\n";
        let record = parse_str(text);
        assert_eq!(
            record["ca"],
            IniValue::List(vec!["CERT-ONE".to_string(), "CERT-TWO".to_string()])
        );
        assert_eq!(record["ca"].as_str(), None);
        assert_eq!(stringify(&record).unwrap(), text);
    }

    #[test]
    fn list_items_needing_quotes_read_back() {
        let mut record = IniRecord::new();
        record.insert(
            "ca".to_string(),
            IniValue::List(vec!["a; b".to_string(), "true".to_string()]),
        );
        let text = stringify(&record).unwrap();
        assert_eq!(parse_str(&text), record);
    }

    #[test]
    fn control_characters_round_trip() {
        let mut record = IniRecord::new();
        record.insert("cert".to_string(), IniValue::from("line1\nline2\t\\end"));
        record.insert("share".to_string(), IniValue::from("\\\\host\\dir"));
        let text = stringify(&record).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(parse_str(&text), record);
    }

    #[test]
    fn inline_comments_are_dropped_from_plain_values() {
        let record = parse_str(
            "registry = http://x/ ; note\nstrict-ssl = false # off\nescaped = a\\;b\\#c\npath = C:\\Users\\npm\n",
        );
        assert_eq!(record["registry"].as_str(), Some("http://x/"));
        assert_eq!(record["strict-ssl"], IniValue::Bool(false));
        assert_eq!(record["escaped"].as_str(), Some("a;b#c"));
        assert_eq!(record["path"].as_str(), Some("C:\\Users\\npm"));
    }

    #[test]
    fn quoted_values_keep_comment_characters() {
        let record = parse_str("a = \"x ; y\"\nb = 'p # q'\n");
        assert_eq!(record["a"].as_str(), Some("x ; y"));
        assert_eq!(record["b"].as_str(), Some("p # q"));
    }
}
