//! Access key management.
//!
//! - `AccessTokens`: resolves the credential (environment, then OS keyring) and saves new ones
//! - `AuthFlow`: interactive configuration and the authentication gate run before commands
//! - `UriLauncher`: opens the desktop app's access key page

mod credential;
mod flow;
mod launch;
mod store;

pub use credential::Credential;
pub use flow::{AuthFlow, FlowOutcome};
pub use launch::{ACCESS_KEY_URI, RecordingLauncher, SystemLauncher, UriLauncher};
pub use store::{
    ACCESS_KEY_ID_VAR, AccessTokens, CredentialResolver, EnvResolver, KeyringBackend,
    MemoryBackend, SECRET_ACCESS_KEY_VAR, SecretBackend,
};
