//! Memoized UID/GID range inventory.

use std::sync::OnceLock;

use rootless_common::config::RootlessConfig;
use rootless_common::error::{IdMapError, Result};
use rootless_common::types::{IdKind, IdMapEntry};

use super::parser::{IdMapParser, ProcIdMapParser};

type CachedRanges = std::result::Result<Vec<IdMapEntry>, IdMapError>;

/// UID and GID ranges of a user namespace, each parsed at most once.
///
/// The first request for a kind runs the parser; concurrent requests wait
/// for that single run. The ranges, or the parse error, are then returned
/// for every later request without touching the map file again.
#[derive(Debug)]
pub struct IdRangeInventory<P = ProcIdMapParser> {
    parser: P,
    config: RootlessConfig,
    uids: OnceLock<CachedRanges>,
    gids: OnceLock<CachedRanges>,
}

impl IdRangeInventory {
    /// Creates an inventory reading the map files named in `config`.
    #[must_use]
    pub fn from_config(config: &RootlessConfig) -> Self {
        Self::with_parser(ProcIdMapParser, config)
    }
}

impl Default for IdRangeInventory {
    fn default() -> Self {
        Self::from_config(&RootlessConfig::default())
    }
}

impl<P: IdMapParser> IdRangeInventory<P> {
    /// Creates an inventory using `parser` on the map files named in `config`.
    #[must_use]
    pub fn with_parser(parser: P, config: &RootlessConfig) -> Self {
        Self {
            parser,
            config: config.clone(),
            uids: OnceLock::new(),
            gids: OnceLock::new(),
        }
    }

    /// Returns the ranges available for `kind`.
    ///
    /// # Errors
    ///
    /// Returns the cached [`IdMapError`] if parsing the map failed.
    pub fn available_ranges(&self, kind: IdKind) -> Result<&[IdMapEntry]> {
        self.cached(kind)
            .as_deref()
            .map_err(|e| e.clone().into())
    }

    /// Returns how many identifiers of `kind` are available.
    ///
    /// # Errors
    ///
    /// Returns the cached [`IdMapError`] if parsing the map failed.
    pub fn available_count(&self, kind: IdKind) -> Result<u64> {
        let ranges = self.available_ranges(kind)?;
        Ok(ranges.iter().map(|range| u64::from(range.count)).sum())
    }

    fn cached(&self, kind: IdKind) -> &CachedRanges {
        let cell = match kind {
            IdKind::Uid => &self.uids,
            IdKind::Gid => &self.gids,
        };
        let path = self.config.id_map(kind);
        cell.get_or_init(|| {
            let parsed = self.parser.parse(path);
            match &parsed {
                Ok(ranges) => {
                    tracing::debug!(%kind, path = %path.display(), ranges = ranges.len(), "parsed ID map");
                }
                Err(e) => tracing::debug!(%kind, error = %e, "ID map unavailable"),
            }
            parsed
        })
    }
}

static SYSTEM: OnceLock<IdRangeInventory> = OnceLock::new();

/// Returns the process-wide inventory for `/proc/self/{uid,gid}_map`.
pub fn system() -> &'static IdRangeInventory {
    SYSTEM.get_or_init(IdRangeInventory::default)
}

/// Returns the UID mappings of the current user namespace.
///
/// # Errors
///
/// Returns an error if `/proc/self/uid_map` could not be parsed.
pub fn available_uid_map() -> Result<&'static [IdMapEntry]> {
    system().available_ranges(IdKind::Uid)
}

/// Returns the GID mappings of the current user namespace.
///
/// # Errors
///
/// Returns an error if `/proc/self/gid_map` could not be parsed.
pub fn available_gid_map() -> Result<&'static [IdMapEntry]> {
    system().available_ranges(IdKind::Gid)
}

/// Returns how many UIDs are available in the current user namespace.
///
/// # Errors
///
/// Returns an error if `/proc/self/uid_map` could not be parsed.
pub fn available_uids() -> Result<u64> {
    system().available_count(IdKind::Uid)
}

/// Returns how many GIDs are available in the current user namespace.
///
/// # Errors
///
/// Returns an error if `/proc/self/gid_map` could not be parsed.
pub fn available_gids() -> Result<u64> {
    system().available_count(IdKind::Gid)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rootless_common::error::RootlessError;

    use super::*;

    struct CountingParser {
        calls: AtomicUsize,
        result: CachedRanges,
    }

    impl CountingParser {
        fn returning(result: CachedRanges) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IdMapParser for &CountingParser {
        fn parse(&self, _path: &Path) -> CachedRanges {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            self.result.clone()
        }
    }

    fn subordinate_ranges() -> Vec<IdMapEntry> {
        vec![
            IdMapEntry::new(0, 100_000, 65_536),
            IdMapEntry::new(1, 165_536, 1),
        ]
    }

    #[test]
    fn count_sums_ranges_and_parses_once() {
        let parser = CountingParser::returning(Ok(subordinate_ranges()));
        let inventory = IdRangeInventory::with_parser(&parser, &RootlessConfig::default());

        for _ in 0..5 {
            assert_eq!(inventory.available_count(IdKind::Uid).expect("count"), 65_537);
        }
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn kinds_are_memoized_independently() {
        let parser = CountingParser::returning(Ok(subordinate_ranges()));
        let inventory = IdRangeInventory::with_parser(&parser, &RootlessConfig::default());

        let _ = inventory.available_ranges(IdKind::Uid).expect("uid");
        let _ = inventory.available_ranges(IdKind::Uid).expect("uid");
        assert_eq!(parser.calls(), 1);
        let gids = inventory.available_ranges(IdKind::Gid).expect("gid");
        assert_eq!(gids, subordinate_ranges().as_slice());
        assert_eq!(parser.calls(), 2);
    }

    #[test]
    fn each_kind_reads_its_configured_map() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RootlessConfig {
            uid_map: dir.path().join("uid_map"),
            gid_map: dir.path().join("gid_map"),
            ..RootlessConfig::default()
        };
        std::fs::write(&config.uid_map, "0 1000 1\n1 100000 65536\n").expect("write uid_map");
        std::fs::write(&config.gid_map, "0 1000 1\n").expect("write gid_map");
        let inventory = IdRangeInventory::from_config(&config);

        assert_eq!(inventory.available_count(IdKind::Uid).expect("uids"), 65_537);
        assert_eq!(inventory.available_count(IdKind::Gid).expect("gids"), 1);
    }

    #[test]
    fn parse_error_is_cached() {
        let parser = CountingParser::returning(Err(IdMapError::Malformed {
            path: PathBuf::from("/proc/self/gid_map"),
            line: 1,
            reason: "expected 3 fields, found 1".into(),
        }));
        let inventory = IdRangeInventory::with_parser(&parser, &RootlessConfig::default());

        let first = inventory.available_count(IdKind::Gid).unwrap_err();
        let second = inventory.available_ranges(IdKind::Gid).unwrap_err();
        let third = inventory.available_count(IdKind::Gid).unwrap_err();
        assert!(matches!(first, RootlessError::IdMap(IdMapError::Malformed { .. })));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.to_string(), third.to_string());
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn concurrent_first_calls_parse_once() {
        let parser = CountingParser::returning(Ok(subordinate_ranges()));
        let inventory = IdRangeInventory::with_parser(&parser, &RootlessConfig::default());

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| inventory.available_count(IdKind::Uid).expect("count")))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().expect("thread"), 65_537);
            }
        });
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn cache_ignores_later_file_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uid_map = dir.path().join("uid_map");
        std::fs::write(&uid_map, "0 1000 1\n").expect("write");
        let config = RootlessConfig {
            uid_map: uid_map.clone(),
            ..RootlessConfig::default()
        };
        let inventory = IdRangeInventory::from_config(&config);

        assert_eq!(inventory.available_count(IdKind::Uid).expect("count"), 1);
        std::fs::write(&uid_map, "0 1000 1\n1 100000 65536\n").expect("rewrite");
        assert_eq!(inventory.available_count(IdKind::Uid).expect("count"), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn system_inventory_reads_proc_self() {
        let ranges = available_uid_map().expect("uid map");
        let total: u64 = ranges.iter().map(|r| u64::from(r.count)).sum();
        assert_eq!(available_uids().expect("uids"), total);
        assert!(available_gids().expect("gids") >= 1);
        assert!(!available_gid_map().expect("gid map").is_empty());
    }
}
