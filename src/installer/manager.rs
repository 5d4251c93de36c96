use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use super::ledger::{InstalledPackage, PackageLedger, validate_package_name};
use crate::auth::Credential;
use crate::config::Settings;
use crate::registry::{PublishResult, Registry, RegistryClient};
use crate::{Error, Result};

/// Package manifest read by `publish`.
pub const PACKAGE_MANIFEST: &str = "package.json";

/// An installed package with a newer release in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPackage {
    pub name: String,
    pub installed: String,
    pub latest: String,
}

/// Result of `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedPackage {
    pub previous_version: String,
    pub package: InstalledPackage,
}

impl UpdatedPackage {
    pub fn changed(&self) -> bool {
        self.previous_version != self.package.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub dry_run: bool,
    pub path: PathBuf,
}

/// Everything the commands need from a package manager.
pub trait PackageManager {
    fn registry(&self) -> &dyn Registry;

    fn installed(&self) -> Result<Vec<InstalledPackage>>;

    fn outdated(&self) -> Result<Vec<OutdatedPackage>>;

    /// Install the given version, or the latest one.
    fn install(&self, name: &str, version: Option<&str>) -> Result<InstalledPackage>;

    /// Move an installed package to the given version, or the latest one.
    fn update(&self, name: &str, version: Option<&str>) -> Result<UpdatedPackage>;

    /// Returns false when the package was not installed.
    fn uninstall(&self, name: &str) -> Result<bool>;

    fn publish(&self, options: &PublishOptions) -> Result<PublishResult>;
}

/// Installs from a registry into a local ledger.
pub struct RegistryPackageManager {
    registry: Box<dyn Registry>,
    ledger: PackageLedger,
}

impl RegistryPackageManager {
    pub fn new(registry: Box<dyn Registry>, ledger: PackageLedger) -> Self {
        Self { registry, ledger }
    }

    /// Connect to the configured registry with the given credential.
    pub fn connect(settings: &Settings, credential: Credential) -> Result<Self> {
        let registry = RegistryClient::new(settings, credential)?;
        Ok(Self::new(
            Box::new(registry),
            PackageLedger::new(settings.packages_dir()),
        ))
    }

    fn fetch_and_record(&self, name: &str, version: Option<&str>) -> Result<InstalledPackage> {
        validate_package_name(name)?;
        let info = self.registry.package_info(name)?;
        let release = info.release(version)?;

        if let Some(existing) = self.ledger.get(name)? {
            if existing.version == release.version && existing.archive_path.exists() {
                debug!(name, version = %existing.version, "already installed");
                return Ok(existing);
            }
        }

        let archive = self.registry.download(release)?;
        self.ledger.record(name, &release.version, &archive)
    }
}

impl PackageManager for RegistryPackageManager {
    fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    fn installed(&self) -> Result<Vec<InstalledPackage>> {
        self.ledger.installed()
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>> {
        let mut outdated = Vec::new();

        for package in self.ledger.installed()? {
            let info = match self.registry.package_info(&package.name) {
                Ok(info) => info,
                Err(Error::PackageNotFound(_)) => {
                    warn!(name = %package.name, "installed package no longer in registry");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if info.latest_version != package.version {
                outdated.push(OutdatedPackage {
                    name: package.name,
                    installed: package.version,
                    latest: info.latest_version,
                });
            }
        }

        Ok(outdated)
    }

    #[instrument(skip(self))]
    fn install(&self, name: &str, version: Option<&str>) -> Result<InstalledPackage> {
        self.fetch_and_record(name, version)
    }

    #[instrument(skip(self))]
    fn update(&self, name: &str, version: Option<&str>) -> Result<UpdatedPackage> {
        validate_package_name(name)?;
        let previous = self
            .ledger
            .get(name)?
            .ok_or_else(|| Error::NotInstalled(name.to_string()))?;

        let package = self.fetch_and_record(name, version)?;
        Ok(UpdatedPackage {
            previous_version: previous.version,
            package,
        })
    }

    #[instrument(skip(self))]
    fn uninstall(&self, name: &str) -> Result<bool> {
        validate_package_name(name)?;
        self.ledger.remove(name)
    }

    #[instrument(skip(self))]
    fn publish(&self, options: &PublishOptions) -> Result<PublishResult> {
        let (name, manifest) = read_package_manifest(&options.path)?;
        self.registry.publish(&name, &manifest, options.dry_run)
    }
}

/// Read `<dir>/package.json`, requiring string `name` and `version` fields.
pub fn read_package_manifest(dir: &Path) -> Result<(String, Value)> {
    let path = dir.join(PACKAGE_MANIFEST);
    let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
        path: path.clone(),
        source: e,
    })?;
    let manifest: Value = serde_json::from_str(&content).map_err(|e| Error::JsonParse {
        path: path.clone(),
        source: e,
    })?;

    let field = |key: &str| {
        manifest
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidPackageManifest {
                path: path.clone(),
                reason: format!("missing \"{key}\" field"),
            })
    };

    let name = field("name")?;
    field("version")?;
    Ok((name, manifest))
}
