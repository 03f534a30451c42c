pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod render;
pub mod repo;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use clap::Parser;
use tracing::{debug, info};

use crate::controller::Controller;
use crate::render::Renderer;
use crate::repo::TaskRepository;
use crate::store::TodoStore;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let parsed = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(parsed.verbose, parsed.quiet)?;

    info!(
        verbose = parsed.verbose,
        quiet = parsed.quiet,
        "starting tick CLI"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(parsed.config.as_deref())?;
    cfg.apply_overrides(pre.rc_overrides);
    cfg.apply_overrides(
        parsed
            .rc_overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone())),
    );

    let data_dir = config::resolve_data_dir(&cfg, parsed.data.as_deref())?;
    let store = TodoStore::open(&data_dir)?;
    let repo = TaskRepository::new(store);
    let mut ctl = Controller::new(
        repo,
        commands::delete_feedback(&cfg),
        commands::resize_quiet(&cfg),
    );
    let mut renderer = Renderer::new(&cfg)?;

    let command = parsed.command.unwrap_or(cli::Command::List {
        mode: view::ViewMode::All,
    });

    commands::dispatch(&mut ctl, &cfg, &mut renderer, command)
}
