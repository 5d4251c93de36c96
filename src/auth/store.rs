use std::cell::RefCell;
use std::rc::Rc;

use keyring::Entry;
use tracing::{debug, instrument, warn};

use super::credential::Credential;
use super::launch::{ACCESS_KEY_URI, UriLauncher};
use crate::Result;

/// Keyring service the credential is stored under.
pub const SERVICE_NAME: &str = "nbpm";

/// Keyring entry holding the serialized credential.
pub const ENTRY_NAME: &str = "access-token";

pub const ACCESS_KEY_ID_VAR: &str = "NBPM_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "NBPM_SECRET_ACCESS_KEY";

/// Storage for the single serialized credential.
pub trait SecretBackend {
    /// Read the stored secret. A missing entry is `Ok(None)`.
    fn read(&self) -> Result<Option<String>>;

    /// Replace the stored secret.
    fn write(&self, secret: &str) -> Result<()>;
}

/// The OS secret store (Keychain, Credential Manager, Secret Service).
pub struct KeyringBackend {
    service: String,
    entry: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entry: entry.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Ok(Entry::new(&self.service, &self.entry)?)
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new(SERVICE_NAME, ENTRY_NAME)
    }
}

impl SecretBackend for KeyringBackend {
    fn read(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, secret: &str) -> Result<()> {
        self.entry()?.set_password(secret)?;
        Ok(())
    }
}

/// In-process secret storage. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    secret: Option<String>,
    writes: usize,
}

impl MemoryBackend {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let backend = Self::default();
        backend.state.borrow_mut().secret = Some(secret.into());
        backend
    }

    pub fn secret(&self) -> Option<String> {
        self.state.borrow().secret.clone()
    }

    /// Number of `write` calls made so far.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }
}

impl SecretBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.secret())
    }

    fn write(&self, secret: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.secret = Some(secret.to_string());
        state.writes += 1;
        Ok(())
    }
}

/// One source of credentials in the precedence chain.
pub trait CredentialResolver {
    fn name(&self) -> &'static str;

    fn resolve(&self) -> Option<Credential>;
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Reads the credential pair from environment variables. Both must be set.
pub struct EnvResolver {
    lookup: EnvLookup,
}

impl EnvResolver {
    pub fn from_process() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Use a custom variable lookup (for testing).
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }
}

impl CredentialResolver for EnvResolver {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn resolve(&self) -> Option<Credential> {
        let id = self.var(ACCESS_KEY_ID_VAR)?;
        let secret = self.var(SECRET_ACCESS_KEY_VAR)?;
        Some(Credential::new(id, secret))
    }
}

/// Reads the credential from a secret backend. Unreadable entries count as absent.
pub struct StoreResolver {
    backend: Rc<dyn SecretBackend>,
}

impl CredentialResolver for StoreResolver {
    fn name(&self) -> &'static str {
        "secret store"
    }

    fn resolve(&self) -> Option<Credential> {
        let secret = match self.backend.read() {
            Ok(secret) => secret?,
            Err(e) => {
                warn!(error = %e, "could not read secret store");
                return None;
            }
        };

        match Credential::from_secret(&secret) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable stored credential");
                None
            }
        }
    }
}

/// Reads, saves, and obtains access tokens.
pub struct AccessTokens {
    backend: Rc<dyn SecretBackend>,
    resolvers: Vec<Box<dyn CredentialResolver>>,
}

impl AccessTokens {
    /// Resolve from the process environment, then the OS keyring.
    pub fn system() -> Self {
        Self::new(Rc::new(KeyringBackend::default()), EnvResolver::from_process())
    }

    pub fn new(backend: Rc<dyn SecretBackend>, env: EnvResolver) -> Self {
        let store = StoreResolver {
            backend: Rc::clone(&backend),
        };
        Self {
            backend,
            resolvers: vec![Box::new(env), Box::new(store)],
        }
    }

    /// Resolve the credential, trying each source in order.
    pub fn get_access_token(&self) -> Option<Credential> {
        self.resolvers.iter().find_map(|resolver| {
            let credential = resolver.resolve();
            if credential.is_some() {
                debug!(source = resolver.name(), "resolved credential");
            }
            credential
        })
    }

    /// Parse a pasted token and persist it in the secret store.
    #[instrument(skip_all)]
    pub fn save_access_token(&self, token: &str) -> Result<Credential> {
        let credential = Credential::from_token(token)?;
        self.backend.write(&credential.to_secret()?)?;
        debug!(access_key_id = %credential.access_key_id, "saved credential");
        Ok(credential)
    }

    /// Ask the desktop app to show the access key. Failure only warns.
    pub fn open_access_key_page(&self, launcher: &dyn UriLauncher) {
        println!("Opening {} ...", ACCESS_KEY_URI);
        println!("If the app does not open, visit that address manually to copy your access key.");

        if let Err(e) = launcher.launch(ACCESS_KEY_URI) {
            warn!(error = %e, "could not launch the desktop app");
            eprintln!("Warning: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::launch::RecordingLauncher;
    use std::collections::HashMap;

    fn env_with(vars: &[(&str, &str)]) -> EnvResolver {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvResolver::with_lookup(move |key| vars.get(key).cloned())
    }

    fn tokens(backend: &MemoryBackend, env: EnvResolver) -> AccessTokens {
        AccessTokens::new(Rc::new(backend.clone()), env)
    }

    #[test]
    fn test_env_overrides_store() {
        let stored = Credential::new("stored-id", "stored-secret");
        let backend = MemoryBackend::with_secret(stored.to_secret().unwrap());
        let env = env_with(&[
            (ACCESS_KEY_ID_VAR, "env-id"),
            (SECRET_ACCESS_KEY_VAR, "env-secret"),
        ]);

        let resolved = tokens(&backend, env).get_access_token().unwrap();
        assert_eq!(resolved, Credential::new("env-id", "env-secret"));
        // Environment never mutates the stored entry
        assert_eq!(backend.secret(), Some(stored.to_secret().unwrap()));
    }

    #[test]
    fn test_env_overrides_empty_store() {
        let backend = MemoryBackend::default();
        let env = env_with(&[(ACCESS_KEY_ID_VAR, "id"), (SECRET_ACCESS_KEY_VAR, "secret")]);

        let resolved = tokens(&backend, env).get_access_token();
        assert_eq!(resolved, Some(Credential::new("id", "secret")));
    }

    #[test]
    fn test_partial_env_falls_back_to_store() {
        let stored = Credential::new("stored-id", "stored-secret");
        let backend = MemoryBackend::with_secret(stored.to_secret().unwrap());
        let env = env_with(&[(ACCESS_KEY_ID_VAR, "env-id")]);

        let resolved = tokens(&backend, env).get_access_token();
        assert_eq!(resolved, Some(stored));
    }

    #[test]
    fn test_absent_when_nothing_configured() {
        let backend = MemoryBackend::default();
        assert_eq!(tokens(&backend, env_with(&[])).get_access_token(), None);
    }

    #[test]
    fn test_unreadable_store_entry_is_absent() {
        let backend = MemoryBackend::with_secret("{not json");
        assert_eq!(tokens(&backend, env_with(&[])).get_access_token(), None);
    }

    #[test]
    fn test_save_then_read_round_trip() {
        let backend = MemoryBackend::default();
        let tokens = tokens(&backend, env_with(&[]));

        let saved = tokens.save_access_token("AKID:secret").unwrap();
        assert_eq!(saved, Credential::new("AKID", "secret"));
        assert_eq!(tokens.get_access_token(), Some(saved));
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn test_save_malformed_token_does_not_write() {
        let backend = MemoryBackend::default();
        let result = tokens(&backend, env_with(&[])).save_access_token(":secret");

        assert!(matches!(result, Err(crate::Error::MalformedToken(_))));
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn test_open_access_key_page_uses_launcher() {
        let backend = MemoryBackend::default();
        let launcher = RecordingLauncher::default();

        tokens(&backend, env_with(&[])).open_access_key_page(&launcher);
        assert_eq!(launcher.launched(), vec![ACCESS_KEY_URI.to_string()]);
    }

    #[test]
    fn test_open_access_key_page_survives_launch_failure() {
        let backend = MemoryBackend::default();
        let launcher = RecordingLauncher::failing();

        tokens(&backend, env_with(&[])).open_access_key_page(&launcher);
        assert_eq!(launcher.launched().len(), 1);
    }

    #[test]
    fn test_keyring_backend_names() {
        let backend = KeyringBackend::default();
        assert_eq!(backend.service, SERVICE_NAME);
        assert_eq!(backend.entry, ENTRY_NAME);
    }
}
