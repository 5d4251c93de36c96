use crate::registry::PackageInfo;
use crate::session::Session;
use crate::Result;

/// Show registry details for a package, marking the installed version.
pub fn run(session: &mut Session, name: &str) -> Result<()> {
    let client = session.client()?;
    let info = client.registry().package_info(name)?;
    let installed = client
        .installed()?
        .into_iter()
        .find(|p| p.name == info.name)
        .map(|p| p.version);

    for line in format_info(&info, installed.as_deref()) {
        println!("{}", line);
    }
    Ok(())
}

fn format_info(info: &PackageInfo, installed: Option<&str>) -> Vec<String> {
    let mut lines = vec![format!("{}@{}", info.name, info.latest_version)];

    if let Some(description) = &info.description {
        lines.push(format!("  {}", description));
    }
    if let Some(repository) = &info.repository {
        lines.push(format!("  Repository: {}", repository));
    }
    if let Some(downloads) = info.downloads {
        lines.push(format!("  Downloads:  {}", downloads));
    }
    match installed {
        Some(version) => lines.push(format!("  Installed:  {}", version)),
        None => lines.push("  Installed:  no".to_string()),
    }

    if !info.releases.is_empty() {
        lines.push("  Releases:".to_string());
        for release in &info.releases {
            let mut line = format!("    {}", release.version);
            if let Some(published_at) = &release.published_at {
                line.push_str(&format!("  {}", published_at));
            }
            if let Some(app_version) = &release.app_version {
                line.push_str(&format!("  (app >= {})", app_version));
            }
            lines.push(line);
        }
    }
    lines
}
