//! `examprep` - practice exams generated from your own study notes
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use std::io;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use cli::Cli;

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output can be piped
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "examprep_context=info,examprep_exam=info,examprep_cli=info".into()
        }))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();
    handlers::run(cli).await
}
