use std::path::PathBuf;

use crate::installer::PublishOptions;
use crate::session::Session;
use crate::Result;

/// Publish the package in `path`, or validate it when `dry_run` is set.
pub fn run(session: &mut Session, path: PathBuf, dry_run: bool) -> Result<()> {
    let options = PublishOptions { dry_run, path };
    let result = session.client()?.publish(&options)?;

    if result.dry_run {
        println!(
            "Dry run: {}@{} is ready to publish (nothing was uploaded)",
            result.name, result.version
        );
        return Ok(());
    }

    println!("Published {}@{}", result.name, result.version);
    if let Some(url) = &result.url {
        println!("  {}", url);
    }
    Ok(())
}
