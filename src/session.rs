use crate::Result;
use crate::auth::{AccessTokens, AuthFlow, Credential, SystemLauncher};
use crate::config::Settings;
use crate::installer::{PackageManager, RegistryPackageManager};
use crate::ui::TerminalPrompter;

/// Builds a package manager for a resolved credential.
pub type ClientFactory = Box<dyn Fn(&Settings, Credential) -> Result<Box<dyn PackageManager>>>;

/// State for a single CLI invocation.
pub struct Session {
    flow: AuthFlow,
    settings: Settings,
    factory: ClientFactory,
    client: Option<Box<dyn PackageManager>>,
}

impl Session {
    /// Terminal prompts, the OS keyring, and the real registry.
    pub fn system(settings: Settings) -> Self {
        let flow = AuthFlow::new(
            AccessTokens::system(),
            Box::new(SystemLauncher),
            Box::new(TerminalPrompter),
        );
        Self::new(
            flow,
            settings,
            Box::new(|settings: &Settings, credential: Credential| {
                let manager = RegistryPackageManager::connect(settings, credential)?;
                Ok(Box::new(manager) as Box<dyn PackageManager>)
            }),
        )
    }

    pub fn new(flow: AuthFlow, settings: Settings, factory: ClientFactory) -> Self {
        Self {
            flow,
            settings,
            factory,
            client: None,
        }
    }

    pub fn flow(&mut self) -> &mut AuthFlow {
        &mut self.flow
    }

    /// The authentication gate.
    pub fn ensure_authenticated(&mut self) -> Result<Credential> {
        self.flow.ensure_authenticated()
    }

    /// The package manager, built on first use with the gate's credential.
    pub fn client(&mut self) -> Result<&dyn PackageManager> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                let credential = self.flow.ensure_authenticated()?;
                (self.factory)(&self.settings, credential)?
            }
        };
        Ok(&**self.client.insert(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{EnvResolver, MemoryBackend, RecordingLauncher};
    use crate::installer::{InstalledPackage, OutdatedPackage, PublishOptions, UpdatedPackage};
    use crate::registry::{PublishResult, Registry};
    use crate::ui::ScriptedPrompter;
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct NoopManager;

    impl PackageManager for NoopManager {
        fn registry(&self) -> &dyn Registry {
            unimplemented!()
        }
        fn installed(&self) -> Result<Vec<InstalledPackage>> {
            Ok(Vec::new())
        }
        fn outdated(&self) -> Result<Vec<OutdatedPackage>> {
            Ok(Vec::new())
        }
        fn install(&self, _name: &str, _version: Option<&str>) -> Result<InstalledPackage> {
            unimplemented!()
        }
        fn update(&self, _name: &str, _version: Option<&str>) -> Result<UpdatedPackage> {
            unimplemented!()
        }
        fn uninstall(&self, _name: &str) -> Result<bool> {
            Ok(false)
        }
        fn publish(&self, _options: &PublishOptions) -> Result<PublishResult> {
            unimplemented!()
        }
    }

    fn settings() -> Settings {
        Settings {
            base_url: "https://registry.example.com".to_string(),
            app_version: None,
            data_dir: PathBuf::from("/unused"),
            timeout: None,
        }
    }

    fn session(backend: &MemoryBackend, prompter: &ScriptedPrompter, built: Rc<Cell<usize>>) -> Session {
        let flow = AuthFlow::new(
            AccessTokens::new(Rc::new(backend.clone()), EnvResolver::with_lookup(|_| None)),
            Box::new(RecordingLauncher::default()),
            Box::new(prompter.clone()),
        );
        Session::new(
            flow,
            settings(),
            Box::new(move |_: &Settings, _: Credential| {
                built.set(built.get() + 1);
                Ok(Box::new(NoopManager) as Box<dyn PackageManager>)
            }),
        )
    }

    #[test]
    fn test_client_is_built_once() {
        let backend = MemoryBackend::with_secret(Credential::new("id", "s").to_secret().unwrap());
        let prompter = ScriptedPrompter::default();
        let built = Rc::new(Cell::new(0));
        let mut session = session(&backend, &prompter, Rc::clone(&built));

        session.client().unwrap().installed().unwrap();
        session.client().unwrap().installed().unwrap();

        assert_eq!(built.get(), 1);
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn test_client_runs_gate_first() {
        let backend = MemoryBackend::default();
        let prompter = ScriptedPrompter::new(["abc123"]);
        let built = Rc::new(Cell::new(0));
        let mut session = session(&backend, &prompter, Rc::clone(&built));

        session.client().unwrap();

        assert_eq!(backend.writes(), 1);
        assert_eq!(prompter.asked().len(), 1);
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn test_failed_gate_builds_nothing() {
        let backend = MemoryBackend::default();
        let prompter = ScriptedPrompter::new([""]);
        let built = Rc::new(Cell::new(0));
        let mut session = session(&backend, &prompter, Rc::clone(&built));

        assert!(matches!(session.client(), Err(crate::Error::EmptyToken)));
        assert_eq!(built.get(), 0);
    }
}
