use crate::session::Session;
use crate::{Error, Result};

/// Remove an installed package and its archives.
pub fn run(session: &mut Session, name: &str) -> Result<()> {
    if !session.client()?.uninstall(name)? {
        return Err(Error::NotInstalled(name.to_string()));
    }

    println!("Uninstalled {}", name);
    Ok(())
}
