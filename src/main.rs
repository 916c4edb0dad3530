use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use inbox_check::config::CheckerConfig;
use inbox_check::pipeline::run_check;
use inbox_check::poller::PollResult;

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(result) => {
            tracing::info!(outcome = %result, "Inbox check finished");
            ExitCode::from(result.exit_code())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<PollResult> {
    let config = CheckerConfig::from_env().context("failed to load configuration")?;

    eprintln!("📬 Inbox Check v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {} (user {})", config.api.base_url, config.api.username);
    eprintln!("   Inbox: {}", config.email.inbox_address);
    eprintln!("   File: {}", config.file_path.display());
    if let Some(path) = &config.settings_file {
        eprintln!("   Settings: {}", path.display());
    }
    eprintln!(
        "   Correlation: {} rounds every {}s, polling: {} rounds every {}s\n",
        config.correlation.max_rounds,
        config.correlation.round_delay.as_secs(),
        config.polling.max_rounds,
        config.polling.delay.as_secs(),
    );

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(cancel.clone(), config.deadline);

    let result = run_check(&config, &cancel)
        .await
        .context("inbox check aborted")?;
    Ok(result)
}

/// Cancel the run on Ctrl-C or when the deadline passes.
fn spawn_cancel_triggers(cancel: CancellationToken, deadline: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling check");
            on_signal.cancel();
        }
    });

    if let Some(deadline) = deadline {
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!(deadline_secs = deadline.as_secs(), "Deadline reached, cancelling check");
                    cancel.cancel();
                }
            }
        });
    }
}
