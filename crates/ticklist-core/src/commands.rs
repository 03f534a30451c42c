use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::config::Config;
use crate::controller::Controller;
use crate::render::Renderer;
use crate::store::Theme;
use crate::task::Priority;
use crate::view;

#[instrument(skip(ctl, cfg, renderer, command))]
pub fn dispatch(
    ctl: &mut Controller,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching");

    match command {
        Command::Add { text, priority } => cmd_add(ctl, &text.join(" "), priority),
        Command::List { mode } => cmd_list(ctl, renderer, mode),
        Command::Done { id } => cmd_set_completed(ctl, id, true),
        Command::Undone { id } => cmd_set_completed(ctl, id, false),
        Command::Edit { id, text } => cmd_edit(ctl, id, &text.join(" ")),
        Command::Rm { id } => cmd_rm(ctl, cfg, id),
        Command::Reorder { ids } => cmd_reorder(ctl, renderer, &ids),
        Command::MarkAll => {
            info!("command mark-all");
            ctl.mark_all()?;
            rerender_from_store(ctl, renderer)
        }
        Command::ClearCompleted => {
            info!("command clear-completed");
            ctl.clear_completed()?;
            rerender_from_store(ctl, renderer)
        }
        Command::ClearAll => {
            info!("command clear-all");
            ctl.clear_all()?;
            rerender_from_store(ctl, renderer)
        }
        Command::Progress => cmd_progress(ctl, renderer),
        Command::Theme { value } => cmd_theme(ctl, cfg, value.as_deref()),
    }
}

#[instrument(skip(ctl, text))]
fn cmd_add(ctl: &mut Controller, text: &str, priority: Priority) -> anyhow::Result<()> {
    info!("command add");

    let (created, _refresh) = ctl.submit(text, priority)?;
    match created {
        Some(task) => println!("Created task {}.", task.id),
        None => println!("Nothing added: task text is empty."),
    }
    Ok(())
}

#[instrument(skip(ctl, renderer))]
fn cmd_list(ctl: &mut Controller, renderer: &mut Renderer, mode: view::ViewMode) -> anyhow::Result<()> {
    info!(?mode, "command list");

    ctl.set_view_mode(mode);
    renderer.print_task_table(&ctl.visible()?)?;

    // counts and progress are always derived from the whole collection,
    // not the filtered subsequence
    let tasks = ctl.repo().tasks()?;
    let (remaining, total) = view::remaining_count(&tasks);
    renderer.print_summary(remaining, total, view::progress_percent(&tasks))?;
    Ok(())
}

#[instrument(skip(ctl))]
fn cmd_set_completed(ctl: &mut Controller, id: u64, completed: bool) -> anyhow::Result<()> {
    info!(id, completed, "command done/undone");

    if ctl.repo().set_completed(id, completed)? {
        println!(
            "Marked task {id} {}.",
            if completed { "done" } else { "not done" }
        );
    } else {
        println!("No task {id}.");
    }
    Ok(())
}

#[instrument(skip(ctl, text))]
fn cmd_edit(ctl: &mut Controller, id: u64, text: &str) -> anyhow::Result<()> {
    info!(id, "command edit");

    if ctl.begin_edit(id)?.is_none() {
        println!("No task {id}.");
        return Ok(());
    }

    let refresh = ctl.commit_edit(text)?;
    if refresh.list {
        println!("Updated task {id}.");
    } else {
        println!("Edit cancelled, text unchanged.");
    }
    Ok(())
}

#[instrument(skip(ctl, cfg))]
fn cmd_rm(ctl: &mut Controller, cfg: &Config, id: u64) -> anyhow::Result<()> {
    info!(id, "command rm");

    let now = Instant::now();
    let refresh = ctl.delete(id, now)?;
    if refresh == crate::controller::Refresh::nothing() {
        println!("No task {id}.");
        return Ok(());
    }

    // the store write already happened; drain the cosmetic removal so the
    // next render does not resurrect the row
    let feedback = delete_feedback(cfg);
    ctl.poll(now + feedback);
    println!("Deleted task {id}.");
    Ok(())
}

#[instrument(skip(ctl, renderer, ids))]
fn cmd_reorder(ctl: &mut Controller, renderer: &mut Renderer, ids: &[u64]) -> anyhow::Result<()> {
    info!(count = ids.len(), "command reorder");

    ctl.repo().reorder(ids)?;
    renderer.print_task_table(&ctl.visible()?)?;
    Ok(())
}

#[instrument(skip(ctl, renderer))]
fn cmd_progress(ctl: &mut Controller, renderer: &mut Renderer) -> anyhow::Result<()> {
    let tasks = ctl.repo().tasks()?;
    let (remaining, total) = view::remaining_count(&tasks);
    renderer.print_summary(remaining, total, view::progress_percent(&tasks))?;
    Ok(())
}

#[instrument(skip(ctl, cfg, value))]
fn cmd_theme(ctl: &mut Controller, cfg: &Config, value: Option<&str>) -> anyhow::Result<()> {
    match value {
        None => {
            let theme = match ctl.repo().store().load_theme()? {
                Some(theme) => theme,
                None => {
                    let fallback = cfg.get("theme.default").unwrap_or_else(|| "dark".to_string());
                    Theme::parse(&fallback)
                        .ok_or_else(|| anyhow!("invalid theme.default: {fallback}"))?
                }
            };
            println!("{}", theme.as_str());
        }
        Some(raw) => {
            let theme =
                Theme::parse(raw).ok_or_else(|| anyhow!("unknown theme: {raw} (light|dark)"))?;
            ctl.repo().store().save_theme(theme)?;
            println!("Theme set to {}.", theme.as_str());
        }
    }
    Ok(())
}

/// Bulk operations re-render the whole list from the store rather than
/// patching the display incrementally.
#[instrument(skip(ctl, renderer))]
fn rerender_from_store(ctl: &mut Controller, renderer: &mut Renderer) -> anyhow::Result<()> {
    renderer.print_task_table(&ctl.visible()?)?;

    let tasks = ctl.repo().tasks()?;
    let (remaining, total) = view::remaining_count(&tasks);
    renderer.print_summary(remaining, total, view::progress_percent(&tasks))?;
    Ok(())
}

pub fn delete_feedback(cfg: &Config) -> Duration {
    Duration::from_millis(cfg.get_u64("delete.feedback.ms").unwrap_or(160))
}

pub fn resize_quiet(cfg: &Config) -> Duration {
    Duration::from_millis(cfg.get_u64("resize.quiet.ms").unwrap_or(220))
}
