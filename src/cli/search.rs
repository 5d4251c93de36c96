use crate::registry::{PackageSummary, SearchSort, SortDirection};
use crate::session::Session;
use crate::Result;

const DESCRIPTION_WIDTH: usize = 60;

/// Search the registry.
pub fn run(
    session: &mut Session,
    query: &str,
    sort: Option<SearchSort>,
    direction: Option<SortDirection>,
) -> Result<()> {
    let results = session.client()?.registry().search(query, sort, direction)?;

    if results.is_empty() {
        println!("No packages found matching '{}'.", query);
        return Ok(());
    }

    for package in &results {
        println!("{}", format_summary(package));
    }
    Ok(())
}

fn format_summary(package: &PackageSummary) -> String {
    let mut line = format!("{}@{}", package.name, package.latest_version);
    if let Some(downloads) = package.downloads {
        line.push_str(&format!(" ({} downloads)", downloads));
    }
    if let Some(description) = package.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str("\n    ");
        line.push_str(&truncate(description, DESCRIPTION_WIDTH));
    }
    line
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}
