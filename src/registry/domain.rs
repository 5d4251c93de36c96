use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sort keys accepted by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SearchSort {
    Score,
    #[value(name = "majorVersion")]
    MajorVersion,
    #[value(name = "createdAt")]
    CreatedAt,
    #[value(name = "updatedAt")]
    UpdatedAt,
    Downloads,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Score => "score",
            SearchSort::MajorVersion => "majorVersion",
            SearchSort::CreatedAt => "createdAt",
            SearchSort::UpdatedAt => "updatedAt",
            SearchSort::Downloads => "downloads",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One hit from a registry search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latest_version: String,
    #[serde(default)]
    pub downloads: Option<u64>,
}

/// A published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub version: String,
    /// Absolute URL of the release archive.
    pub tarball: String,
    /// App version range the release declares support for.
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Registry metadata for a single package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    pub latest_version: String,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl PackageInfo {
    /// Pick the requested release, or the one the registry marks as latest.
    pub fn release(&self, version: Option<&str>) -> Result<&Release> {
        let wanted = version.unwrap_or(self.latest_version.as_str());
        self.releases
            .iter()
            .find(|release| release.version == wanted)
            .ok_or_else(|| Error::VersionNotFound {
                name: self.name.clone(),
                version: wanted.to_string(),
            })
    }
}

/// Registry response to a publish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub url: Option<String>,
}
