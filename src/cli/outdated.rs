use crate::installer::OutdatedPackage;
use crate::session::Session;
use crate::Result;

/// List installed packages with a newer release in the registry.
pub fn run(session: &mut Session) -> Result<()> {
    let outdated = session.client()?.outdated()?;

    if outdated.is_empty() {
        println!("All packages are up to date.");
        return Ok(());
    }

    for line in format_outdated(&outdated) {
        println!("{}", line);
    }
    println!();
    println!("Run `nbpm update <name>` to update a package.");
    Ok(())
}

fn format_outdated(packages: &[OutdatedPackage]) -> Vec<String> {
    let name_width = packages
        .iter()
        .map(|p| p.name.len())
        .chain(std::iter::once("Package".len()))
        .max()
        .unwrap_or(0);
    let installed_width = packages
        .iter()
        .map(|p| p.installed.len())
        .chain(std::iter::once("Installed".len()))
        .max()
        .unwrap_or(0);

    let mut lines = vec![format!(
        "{:<nw$}  {:<iw$}  Latest",
        "Package",
        "Installed",
        nw = name_width,
        iw = installed_width
    )];
    lines.extend(packages.iter().map(|p| {
        format!(
            "{:<nw$}  {:<iw$}  {}",
            p.name,
            p.installed,
            p.latest,
            nw = name_width,
            iw = installed_width
        )
    }));
    lines
}
