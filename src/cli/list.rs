use crate::installer::InstalledPackage;
use crate::session::Session;
use crate::Result;

/// List installed packages.
pub fn run(session: &mut Session) -> Result<()> {
    let packages = session.client()?.installed()?;

    if packages.is_empty() {
        println!("No packages installed. Run `nbpm search <query>` to find some.");
        return Ok(());
    }

    println!("Installed packages ({}):", packages.len());
    for line in format_installed(&packages) {
        println!("{}", line);
    }
    Ok(())
}

fn format_installed(packages: &[InstalledPackage]) -> Vec<String> {
    let width = packages.iter().map(|p| p.name.len()).max().unwrap_or(0);
    packages
        .iter()
        .map(|p| {
            format!(
                "  {:<width$}  {}  (updated {})",
                p.name,
                p.version,
                p.last_updated.format("%Y-%m-%d"),
                width = width
            )
        })
        .collect()
}
