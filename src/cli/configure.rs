use crate::session::Session;
use crate::Result;

/// Run the interactive access key setup. Declining to replace a key is not an error.
pub fn run(session: &mut Session) -> Result<()> {
    session.flow().configure()?;
    Ok(())
}
