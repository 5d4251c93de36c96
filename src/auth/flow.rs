use tracing::{debug, info};

use super::credential::Credential;
use super::launch::UriLauncher;
use super::store::AccessTokens;
use crate::ui::Prompter;
use crate::{Error, Result};

const REAUTH_QUESTION: &str = "An access key is already configured. Replace it?";
const TOKEN_PROMPT: &str = "Paste your access key: ";

/// Steps of the configuration flow.
enum Step {
    CheckExisting,
    ReauthConfirm,
    LaunchApp,
    PromptToken,
    Validate(String),
    Persist(String),
    Done(Credential),
    Cancelled,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::CheckExisting => "check-existing",
            Step::ReauthConfirm => "reauth-confirm",
            Step::LaunchApp => "launch-app",
            Step::PromptToken => "prompt-token",
            Step::Validate(_) => "validate",
            Step::Persist(_) => "persist",
            Step::Done(_) => "done",
            Step::Cancelled => "cancelled",
        }
    }
}

/// How a configuration run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Configured(Credential),
    Cancelled,
}

/// Drives first-run and re-configuration of the access key.
///
/// Holds the credential resolved during this invocation so repeated gate
/// checks never hit the secret store or prompt twice.
pub struct AuthFlow {
    tokens: AccessTokens,
    launcher: Box<dyn UriLauncher>,
    prompter: Box<dyn Prompter>,
    cached: Option<Credential>,
}

impl AuthFlow {
    pub fn new(
        tokens: AccessTokens,
        launcher: Box<dyn UriLauncher>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            tokens,
            launcher,
            prompter,
            cached: None,
        }
    }

    /// Run the full flow, asking before replacing an existing key.
    pub fn configure(&mut self) -> Result<FlowOutcome> {
        self.run_from(Step::CheckExisting)
    }

    /// Return a usable credential, running the flow only when none exists.
    pub fn ensure_authenticated(&mut self) -> Result<Credential> {
        if let Some(credential) = &self.cached {
            return Ok(credential.clone());
        }

        if let Some(credential) = self.tokens.get_access_token() {
            self.cached = Some(credential.clone());
            return Ok(credential);
        }

        println!("No access key is configured yet.");
        match self.run_from(Step::LaunchApp)? {
            FlowOutcome::Configured(credential) => Ok(credential),
            FlowOutcome::Cancelled => Err(Error::NotConfigured),
        }
    }

    fn run_from(&mut self, start: Step) -> Result<FlowOutcome> {
        let mut step = start;

        loop {
            debug!(step = step.name(), "auth flow");

            step = match step {
                Step::CheckExisting => match self.tokens.get_access_token() {
                    Some(_) => Step::ReauthConfirm,
                    None => Step::LaunchApp,
                },
                Step::ReauthConfirm => {
                    if self.prompter.confirm(REAUTH_QUESTION)? {
                        Step::LaunchApp
                    } else {
                        Step::Cancelled
                    }
                }
                Step::LaunchApp => {
                    self.tokens.open_access_key_page(self.launcher.as_ref());
                    Step::PromptToken
                }
                Step::PromptToken => Step::Validate(self.prompter.read_secret(TOKEN_PROMPT)?),
                Step::Validate(token) => {
                    if token.trim().is_empty() {
                        return Err(Error::EmptyToken);
                    }
                    Step::Persist(token)
                }
                Step::Persist(token) => Step::Done(self.tokens.save_access_token(&token)?),
                Step::Done(credential) => {
                    info!(access_key_id = %credential.access_key_id, "access key configured");
                    println!("Access key saved.");
                    self.cached = Some(credential.clone());
                    return Ok(FlowOutcome::Configured(credential));
                }
                Step::Cancelled => {
                    println!("Cancelled. The existing access key was kept.");
                    return Ok(FlowOutcome::Cancelled);
                }
            };
        }
    }
}
