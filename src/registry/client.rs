use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use tracing::{debug, instrument};

use super::Registry;
use super::domain::{PackageInfo, PackageSummary, PublishResult, Release, SearchSort, SortDirection};
use crate::auth::Credential;
use crate::config::Settings;
use crate::{Error, Result};

const APP_VERSION_HEADER: &str = "X-App-Version";

/// Blocking HTTP client for the package registry.
pub struct RegistryClient {
    client: Client,
    base_url: Url,
    credential: Credential,
    app_version: Option<String>,
}

impl RegistryClient {
    pub fn new(settings: &Settings, credential: Credential) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| Error::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: settings.base_url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let mut builder =
            Client::builder().user_agent(concat!("nbpm/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| Error::Registry {
            operation: "create HTTP client".to_string(),
            source,
        })?;

        Ok(Self {
            client,
            base_url,
            credential,
            app_version: settings.app_version.clone(),
        })
    }

    /// Build `{base}/seg/seg...`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.client.request(method, url).basic_auth(
            &self.credential.access_key_id,
            Some(&self.credential.secret_access_key),
        );
        if let Some(version) = &self.app_version {
            request = request.header(APP_VERSION_HEADER, version);
        }
        request
    }

    /// Send a request, turning transport failures and non-2xx statuses into errors.
    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().map_err(|source| Error::Registry {
            operation: operation.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(%status, operation, "registry response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(Error::RegistryStatus {
            operation: operation.to_string(),
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    fn json<T: serde::de::DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        response.json().map_err(|source| Error::Registry {
            operation: operation.to_string(),
            source,
        })
    }
}

impl Registry for RegistryClient {
    #[instrument(skip(self))]
    fn search(
        &self,
        query: &str,
        sort: Option<SearchSort>,
        direction: Option<SortDirection>,
    ) -> Result<Vec<PackageSummary>> {
        let operation = format!("search for '{query}'");

        let mut params = vec![("q", query)];
        if let Some(sort) = sort {
            params.push(("sort", sort.as_str()));
        }
        if let Some(direction) = direction {
            params.push(("direction", direction.as_str()));
        }

        let url = self.endpoint(&["packages", "search"]);
        let response = self.send(&operation, self.request(Method::GET, url).query(&params))?;
        Self::json(&operation, response)
    }

    #[instrument(skip(self))]
    fn package_info(&self, name: &str) -> Result<PackageInfo> {
        let operation = format!("fetch package '{name}'");
        let url = self.endpoint(&["packages", name]);

        match self.send(&operation, self.request(Method::GET, url)) {
            Ok(response) => Self::json(&operation, response),
            Err(Error::RegistryStatus { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(Error::PackageNotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(version = %release.version))]
    fn download(&self, release: &Release) -> Result<Vec<u8>> {
        let operation = format!("download {}", release.tarball);
        let url = Url::parse(&release.tarball).map_err(|e| Error::InvalidUrl {
            url: release.tarball.clone(),
            reason: e.to_string(),
        })?;

        // Credentials only go to the registry itself, never to a CDN it points at
        let request = if url.origin() == self.base_url.origin() {
            self.request(Method::GET, url)
        } else {
            debug!(host = url.host_str().unwrap_or_default(), "downloading without credentials");
            self.client.get(url)
        };

        let response = self.send(&operation, request)?;
        let bytes = response.bytes().map_err(|source| Error::Registry {
            operation: operation.clone(),
            source,
        })?;
        debug!(size = bytes.len(), "downloaded archive");
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, manifest))]
    fn publish(&self, name: &str, manifest: &serde_json::Value, dry_run: bool) -> Result<PublishResult> {
        let operation = format!("publish '{name}'");
        let url = self.endpoint(&["packages", name, "releases"]);

        let mut request = self.request(Method::POST, url).json(manifest);
        if dry_run {
            request = request.query(&[("dryrun", "true")]);
        }

        let response = self.send(&operation, request)?;
        let mut result: PublishResult = Self::json(&operation, response)?;
        result.dry_run = dry_run;
        Ok(result)
    }
}
