use crate::session::Session;
use crate::Result;

/// Install a package, or a specific version of it.
pub fn install(session: &mut Session, name: &str, version: Option<&str>) -> Result<()> {
    match version {
        Some(version) => println!("Installing {}@{}...", name, version),
        None => println!("Installing {}...", name),
    }

    let package = session.client()?.install(name, version)?;
    println!("Installed {}@{}", package.name, package.version);
    println!("  {}", package.archive_path.display());
    Ok(())
}

/// Update an installed package to the latest or a given version.
pub fn update(session: &mut Session, name: &str, version: Option<&str>) -> Result<()> {
    let updated = session.client()?.update(name, version)?;

    if updated.changed() {
        println!(
            "Updated {}: {} -> {}",
            name, updated.previous_version, updated.package.version
        );
    } else {
        println!("{} is already at {}", name, updated.package.version);
    }
    Ok(())
}
