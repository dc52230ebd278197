pub mod cli;
pub mod config;
pub mod datetime;
pub mod filter;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::io::{self, IsTerminal};

use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::reconcile::{
  SystemClock,
  UuidV4
};
use crate::session::{
  Flow,
  Session
};
use crate::view::ViewProvider;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting todo session"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.todorc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let stdout = io::stdout();
  if !stdout.is_terminal() {
    cfg.apply_overrides([(
      "color".to_string(),
      "off".to_string()
    )]);
  }

  let _view_scope = ViewProvider::enter();
  let mut session = Session::new(
    &cfg,
    stdout.lock(),
    UuidV4,
    SystemClock
  )?;

  if !cli.rest.is_empty() {
    let words = cli
      .rest
      .into_iter()
      .map(|arg| {
        arg.to_string_lossy().to_string()
      })
      .collect();
    if session.execute_words(words)?
      == Flow::Quit
    {
      info!("done");
      return Ok(());
    }
  }

  let stdin = io::stdin();
  let prompt = stdin.is_terminal();
  session.run(stdin.lock(), prompt)?;

  info!("done");
  Ok(())
}
