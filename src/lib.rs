pub mod auth;
pub mod cli;
pub mod config;
pub mod installer;
pub mod registry;
pub mod session;
pub mod ui;

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Credential errors
    #[error("access token must not be empty")]
    EmptyToken,

    #[error("malformed access token: {0}")]
    MalformedToken(String),

    #[error("secret store unavailable: {0}")]
    SecretStore(#[from] keyring::Error),

    #[error("stored credential has an invalid format: {0}")]
    CredentialFormat(#[source] serde_json::Error),

    #[error("no access key configured (run `nbpm configure`)")]
    NotConfigured,

    #[error("failed to open {uri}: {source}")]
    Launch {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read input: {0}")]
    Prompt(#[source] std::io::Error),

    // Config errors
    #[error("failed to parse config {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("could not determine data directory")]
    NoDataDir,

    // Registry errors
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{operation} failed: {source}")]
    Registry {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} failed with HTTP {status}: {body}")]
    RegistryStatus {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("package '{0}' not found in registry")]
    PackageNotFound(String),

    #[error("version {version} of package '{name}' not found in registry")]
    VersionNotFound { name: String, version: String },

    // Local package errors
    #[error("invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: String },

    #[error("invalid version '{version}' for package '{name}'")]
    InvalidVersion { name: String, version: String },

    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    #[error("invalid package manifest {path}: {reason}")]
    InvalidPackageManifest { path: PathBuf, reason: String },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON in {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
