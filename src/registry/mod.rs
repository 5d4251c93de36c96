mod client;
mod domain;

pub use client::RegistryClient;
pub use domain::{
    PackageInfo, PackageSummary, PublishResult, Release, SearchSort, SortDirection,
};

use crate::Result;

/// Remote catalog operations. Every call may fail and none is retried.
pub trait Registry {
    fn search(
        &self,
        query: &str,
        sort: Option<SearchSort>,
        direction: Option<SortDirection>,
    ) -> Result<Vec<PackageSummary>>;

    fn package_info(&self, name: &str) -> Result<PackageInfo>;

    /// Fetch the archive of a release.
    fn download(&self, release: &Release) -> Result<Vec<u8>>;

    /// Submit a package manifest. With `dry_run` the registry validates without storing.
    fn publish(
        &self,
        name: &str,
        manifest: &serde_json::Value,
        dry_run: bool,
    ) -> Result<PublishResult>;
}
