use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{Error, Result};

pub const LEDGER_FILENAME: &str = "installed.json";

const STAGING_FILENAME: &str = "installed.json.tmp";

const LEDGER_VERSION: u32 = 1;

/// On-disk format of installed.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFile {
    pub version: u32,
    pub packages: BTreeMap<String, InstalledPackage>,
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            packages: BTreeMap::new(),
        }
    }
}

/// A package present in the local packages directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub archive_path: PathBuf,
    pub installed_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Check that a package name is `name` or `@scope/name` and stays inside the
/// packages directory when joined onto it.
pub fn validate_package_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidPackageName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    let segments: Vec<&str> = name.split('/').collect();
    match segments.as_slice() {
        [plain] if plain.starts_with('@') => {
            return invalid("scoped names must look like @scope/name");
        }
        [plain] => check_segment(plain).or_else(|reason| invalid(reason))?,
        [scope, plain] => {
            let Some(scope) = scope.strip_prefix('@') else {
                return invalid("only @scope/name may contain '/'");
            };
            check_segment(scope).or_else(|reason| invalid(reason))?;
            check_segment(plain).or_else(|reason| invalid(reason))?;
        }
        _ => return invalid("too many '/' separators"),
    }

    if name == LEDGER_FILENAME || name == STAGING_FILENAME {
        return invalid("reserved name");
    }
    Ok(())
}

fn check_segment(segment: &str) -> std::result::Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty name segment");
    }
    if segment == "." || segment == ".." {
        return Err("relative path segment");
    }
    if segment
        .chars()
        .any(|c| c == '\\' || c == ':' || c.is_control())
    {
        return Err("contains a path separator or control character");
    }
    Ok(())
}

/// Tracks installed packages and their archives.
///
/// Layout:
/// - `<packages_dir>/installed.json`
/// - `<packages_dir>/<name>/<name>-<version>.tgz`
pub struct PackageLedger {
    packages_dir: PathBuf,
}

impl PackageLedger {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.packages_dir.join(LEDGER_FILENAME)
    }

    fn staging_path(&self) -> PathBuf {
        self.packages_dir.join(STAGING_FILENAME)
    }

    /// Directory holding a package's archives. Scoped names (`@scope/name`) nest.
    pub fn package_dir(&self, name: &str) -> Result<PathBuf> {
        validate_package_name(name)?;
        Ok(self.packages_dir.join(name))
    }

    pub fn archive_path(&self, name: &str, version: &str) -> Result<PathBuf> {
        if version.contains('/') || check_segment(version).is_err() {
            return Err(Error::InvalidVersion {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        let file_stem = name.rsplit('/').next().unwrap_or(name);
        Ok(self
            .package_dir(name)?
            .join(format!("{}-{}.tgz", file_stem, version)))
    }

    /// Read installed.json, or an empty ledger if it does not exist yet.
    pub fn read(&self) -> Result<LedgerFile> {
        let path = self.ledger_path();
        if !path.exists() {
            return Ok(LedgerFile::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
            path: path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| Error::JsonParse { path, source: e })
    }

    /// Replace installed.json via a staging file so readers never see a partial write.
    pub fn write(&self, file: &LedgerFile) -> Result<()> {
        let path = self.ledger_path();
        let staging = self.staging_path();
        create_parent(&path)?;

        let content = serde_json::to_string_pretty(file).map_err(|e| Error::JsonParse {
            path: path.clone(),
            source: e,
        })?;

        std::fs::write(&staging, content).map_err(|e| Error::FileWrite {
            path: staging.clone(),
            source: e,
        })?;
        std::fs::rename(&staging, &path).map_err(|e| Error::FileWrite { path, source: e })
    }

    pub fn installed(&self) -> Result<Vec<InstalledPackage>> {
        Ok(self.read()?.packages.into_values().collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<InstalledPackage>> {
        Ok(self.read()?.packages.remove(name))
    }

    /// Store an archive and record it, replacing any other version of the package.
    ///
    /// The old archive is only deleted once the ledger points at the new one.
    pub fn record(&self, name: &str, version: &str, archive: &[u8]) -> Result<InstalledPackage> {
        let archive_path = self.archive_path(name, version)?;
        let mut file = self.read()?;
        let previous = file.packages.get(name).cloned();

        create_parent(&archive_path)?;
        std::fs::write(&archive_path, archive).map_err(|e| Error::FileWrite {
            path: archive_path.clone(),
            source: e,
        })?;

        let now = Utc::now();
        let entry = InstalledPackage {
            name: name.to_string(),
            version: version.to_string(),
            archive_path: archive_path.clone(),
            installed_at: previous.as_ref().map(|old| old.installed_at).unwrap_or(now),
            last_updated: now,
        };
        file.packages.insert(name.to_string(), entry.clone());

        let stale = previous.map(|old| old.archive_path);
        let overwrote_recorded = stale.as_ref() == Some(&archive_path);

        if let Err(e) = self.write(&file) {
            if !overwrote_recorded {
                discard(&archive_path);
            }
            return Err(e);
        }

        if let Some(old) = stale.filter(|old| *old != archive_path) {
            remove_file_if_exists(&old)?;
        }
        Ok(entry)
    }

    /// Forget a package and delete its archives. Returns false if it was not installed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let dir = self.package_dir(name)?;
        let mut file = self.read()?;
        if file.packages.remove(name).is_none() {
            return Ok(false);
        }

        self.write(&file)?;

        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| Error::FileWrite {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(true)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// Best effort; the ledger error is what gets reported.
fn discard(path: &Path) {
    if let Err(e) = remove_file_if_exists(path) {
        warn!(error = %e, "could not remove unrecorded archive");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ledger() -> (tempfile::TempDir, PackageLedger) {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = PackageLedger::new(temp_dir.path().join("packages"));
        (temp_dir, ledger)
    }

    #[test]
    fn test_read_missing_ledger() {
        let (_temp, ledger) = ledger();
        let file = ledger.read().unwrap();
        assert_eq!(file.version, 1);
        assert!(file.packages.is_empty());
        assert!(ledger.installed().unwrap().is_empty());
    }

    #[test]
    fn test_archive_path() {
        let ledger = PackageLedger::new("/data/packages");
        assert_eq!(
            ledger.archive_path("vim-mode", "2.1.0").unwrap(),
            PathBuf::from("/data/packages/vim-mode/vim-mode-2.1.0.tgz")
        );
        assert_eq!(
            ledger.archive_path("@acme/dark", "1.0.0").unwrap(),
            PathBuf::from("/data/packages/@acme/dark/dark-1.0.0.tgz")
        );
    }

    #[test]
    fn test_validate_package_name() {
        for name in ["vim-mode", "@acme/dark", "theme.v2", "@a/b"] {
            assert!(validate_package_name(name).is_ok(), "{name} should be valid");
        }
        for name in [
            "",
            "/tmp/victim",
            "..",
            "../escape",
            "@acme/..",
            "@acme",
            "acme/dark",
            "@acme/dark/extra",
            "@/dark",
            "C:evil",
            "a\\b",
            LEDGER_FILENAME,
            STAGING_FILENAME,
        ] {
            assert!(
                matches!(validate_package_name(name), Err(Error::InvalidPackageName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_archive_path_rejects_path_like_versions() {
        let ledger = PackageLedger::new("/data/packages");
        for version in ["", "..", "1.0/../../x", "1.0\\x"] {
            assert!(
                matches!(
                    ledger.archive_path("vim-mode", version),
                    Err(Error::InvalidVersion { .. })
                ),
                "{version:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_record_rejects_path_escaping_names() {
        let (temp, ledger) = ledger();
        let outside = temp.path().join("victim");

        let result = ledger.record(outside.to_str().unwrap(), "1.0.0", b"x");

        assert!(matches!(result, Err(Error::InvalidPackageName { .. })));
        assert!(!outside.exists());
        assert!(matches!(
            ledger.record(LEDGER_FILENAME, "1.0.0", b"x"),
            Err(Error::InvalidPackageName { .. })
        ));
    }

    #[test]
    fn test_remove_rejects_path_escaping_names() {
        let (temp, ledger) = ledger();
        let outside = temp.path().join("keep");
        fs::create_dir_all(&outside).unwrap();

        let result = ledger.remove(outside.to_str().unwrap());

        assert!(matches!(result, Err(Error::InvalidPackageName { .. })));
        assert!(outside.exists());
    }

    #[test]
    fn test_record_writes_archive_and_entry() {
        let (_temp, ledger) = ledger();

        let entry = ledger.record("vim-mode", "2.1.0", b"archive").unwrap();

        assert_eq!(entry.version, "2.1.0");
        assert_eq!(fs::read(&entry.archive_path).unwrap(), b"archive");
        assert_eq!(entry.installed_at, entry.last_updated);
        assert_eq!(ledger.get("vim-mode").unwrap(), Some(entry));
        assert!(ledger.ledger_path().exists());
    }

    #[test]
    fn test_timestamps_are_rfc3339_in_ledger() {
        let (_temp, ledger) = ledger();
        ledger.record("vim-mode", "2.1.0", b"archive").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(ledger.ledger_path()).unwrap()).unwrap();
        let installed_at = raw["packages"]["vim-mode"]["installedAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(installed_at).is_ok());
    }

    #[test]
    fn test_record_new_version_replaces_old_archive() {
        let (_temp, ledger) = ledger();

        let first = ledger.record("vim-mode", "1.0.0", b"v1").unwrap();
        let second = ledger.record("vim-mode", "2.0.0", b"v2").unwrap();

        assert!(!first.archive_path.exists());
        assert!(second.archive_path.exists());
        assert_eq!(second.installed_at, first.installed_at);
        assert!(second.last_updated >= first.last_updated);

        let installed = ledger.installed().unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].version, "2.0.0");
    }

    #[test]
    fn test_failed_ledger_write_keeps_old_archive() {
        let (_temp, ledger) = ledger();
        let first = ledger.record("vim-mode", "1.0.0", b"v1").unwrap();

        // A directory in the staging file's place makes the ledger write fail
        fs::create_dir_all(ledger.staging_path()).unwrap();
        let result = ledger.record("vim-mode", "2.0.0", b"v2");

        assert!(matches!(result, Err(Error::FileWrite { .. })));
        assert!(first.archive_path.exists());
        assert!(!ledger.archive_path("vim-mode", "2.0.0").unwrap().exists());
        assert_eq!(ledger.get("vim-mode").unwrap(), Some(first));
    }

    #[test]
    fn test_record_keeps_other_packages() {
        let (_temp, ledger) = ledger();

        ledger.record("vim-mode", "1.0.0", b"a").unwrap();
        ledger.record("math", "0.2.0", b"b").unwrap();

        let names: Vec<String> = ledger.installed().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["math", "vim-mode"]);
    }

    #[test]
    fn test_remove() {
        let (_temp, ledger) = ledger();
        let entry = ledger.record("vim-mode", "1.0.0", b"a").unwrap();

        assert!(ledger.remove("vim-mode").unwrap());
        assert!(!entry.archive_path.exists());
        assert_eq!(ledger.get("vim-mode").unwrap(), None);
        assert!(!ledger.remove("vim-mode").unwrap());
    }

    #[test]
    fn test_read_corrupt_ledger() {
        let (_temp, ledger) = ledger();
        fs::create_dir_all(ledger.packages_dir()).unwrap();
        fs::write(ledger.ledger_path(), "{ nope").unwrap();

        assert!(matches!(ledger.read(), Err(Error::JsonParse { .. })));
    }
}
