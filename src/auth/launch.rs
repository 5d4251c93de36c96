use std::cell::RefCell;
use std::rc::Rc;

use crate::{Error, Result};

/// Custom URI that asks the desktop app to reveal the user's access key.
pub const ACCESS_KEY_URI: &str = "notebook://preferences/access-keys";

/// Hands a URI to whatever handles it on this machine.
pub trait UriLauncher {
    fn launch(&self, uri: &str) -> Result<()>;
}

/// Uses the platform's default handler for the URI scheme.
pub struct SystemLauncher;

impl UriLauncher for SystemLauncher {
    fn launch(&self, uri: &str) -> Result<()> {
        open::that(uri).map_err(|source| Error::Launch {
            uri: uri.to_string(),
            source,
        })
    }
}

/// Records launched URIs instead of opening them. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    launched: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl RecordingLauncher {
    /// A recorder whose every launch fails.
    pub fn failing() -> Self {
        Self {
            launched: Rc::default(),
            fail: true,
        }
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.borrow().clone()
    }
}

impl UriLauncher for RecordingLauncher {
    fn launch(&self, uri: &str) -> Result<()> {
        self.launched.borrow_mut().push(uri.to_string());
        if self.fail {
            return Err(Error::Launch {
                uri: uri.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no handler registered"),
            });
        }
        Ok(())
    }
}
