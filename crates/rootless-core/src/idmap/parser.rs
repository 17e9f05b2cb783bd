//! Parser for `/proc/<pid>/uid_map` and `/proc/<pid>/gid_map`.
//!
//! Each line of a map holds three whitespace-separated unsigned integers:
//! the first ID inside the namespace, the first ID outside it, and the
//! length of the range.

use std::path::Path;
use std::sync::Arc;

use rootless_common::error::IdMapError;
use rootless_common::types::IdMapEntry;

/// Reads an ID map into its ranges.
pub trait IdMapParser {
    /// Parses the ID map stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    fn parse(&self, path: &Path) -> Result<Vec<IdMapEntry>, IdMapError>;
}

/// Parses kernel ID-map files from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcIdMapParser;

impl IdMapParser for ProcIdMapParser {
    fn parse(&self, path: &Path) -> Result<Vec<IdMapEntry>, IdMapError> {
        let content = std::fs::read_to_string(path).map_err(|e| IdMapError::Read {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        parse_id_map(path, &content)
    }
}

/// Parses the text of an ID map. `path` is only used in error messages.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`IdMapError::Malformed`] for a line that does not hold exactly
/// three unsigned integers or whose range count is zero.
pub fn parse_id_map(path: &Path, content: &str) -> Result<Vec<IdMapEntry>, IdMapError> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let malformed = |reason: String| IdMapError::Malformed {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let [container, host, count] = fields[..] else {
            return Err(malformed(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };

        let parse_field = |name: &str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|e| malformed(format!("invalid {name} {value:?}: {e}")))
        };
        let entry = IdMapEntry::new(
            parse_field("container id", container)?,
            parse_field("host id", host)?,
            parse_field("range count", count)?,
        );
        if entry.count == 0 {
            return Err(malformed("range count must be at least 1".into()));
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Vec<IdMapEntry>, IdMapError> {
        parse_id_map(Path::new("/proc/self/uid_map"), content)
    }

    #[test]
    fn parses_kernel_formatted_map() {
        let content = "         0     100000      65536\n     65536     165536          1\n";
        let entries = parse(content).expect("should parse");
        assert_eq!(
            entries,
            vec![
                IdMapEntry::new(0, 100_000, 65_536),
                IdMapEntry::new(65_536, 165_536, 1),
            ]
        );
    }

    #[test]
    fn parses_full_identity_map() {
        let entries = parse("0 0 4294967295\n").expect("should parse");
        assert_eq!(entries, vec![IdMapEntry::new(0, 0, u32::MAX)]);
    }

    #[test]
    fn skips_blank_lines() {
        let entries = parse("\n0 1000 1\n\n  \n1 100000 65536").expect("should parse");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn empty_map_has_no_ranges() {
        assert!(parse("").expect("should parse").is_empty());
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse("0 1000 1\n0 1000\n").unwrap_err();
        match err {
            IdMapError::Malformed { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("expected 3 fields, found 2"), "got: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_non_numeric_field() {
        let err = parse("0 abc 1\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 1"), "got: {msg}");
        assert!(msg.contains("host id"), "got: {msg}");
    }

    #[test]
    fn rejects_negative_field() {
        assert!(parse("-1 1000 1\n").is_err());
    }

    #[test]
    fn rejects_zero_count() {
        let err = parse("0 1000 0\n").unwrap_err();
        assert!(err.to_string().contains("at least 1"), "got: {err}");
    }

    #[test]
    fn read_error_names_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("uid_map");
        let err = ProcIdMapParser.parse(&path).unwrap_err();
        assert!(matches!(err, IdMapError::Read { .. }));
        assert!(err.to_string().contains("uid_map"), "got: {err}");
    }

    #[test]
    fn reads_map_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gid_map");
        std::fs::write(&path, "0 1000 1\n1 100000 65536\n").expect("write");
        let entries = ProcIdMapParser.parse(&path).expect("should parse");
        assert_eq!(entries[1], IdMapEntry::new(1, 100_000, 65_536));
    }
}
