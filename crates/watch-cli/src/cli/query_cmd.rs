use super::render::{page_footer, project_row, run_row};
use super::*;
use watch_core::window::AuditWindow;

pub(super) async fn handle_audits(args: AuditsArgs, config: &WatchConfig) -> anyhow::Result<()> {
    let api = connect(config)?;
    let limit = args.limit.unwrap_or(config.page_limit).max(1);
    let mut window = AuditWindow::new(args.repo.as_str(), limit);
    let window = window
        .load_page(api.as_ref(), args.offset)
        .await
        .with_context(|| format!("load audits for {}", args.repo))?;

    if window.items.is_empty() {
        println!("No audit runs at offset {}.", args.offset);
    }
    for run in &window.items {
        println!("{}", run_row(run));
    }
    println!("{}", page_footer(window, args.offset));
    Ok(())
}

pub(super) async fn handle_projects(config: &WatchConfig) -> anyhow::Result<()> {
    let api = connect(config)?;
    let projects = api.list_projects().await.context("list projects")?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    for project in &projects {
        println!("{}", project_row(project));
    }
    Ok(())
}
