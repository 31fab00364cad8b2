mod middleware;
mod scheduler;
mod view;

use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use hashmood_core::{AppConfig, SharedConfig};
use hashmood_sentiment::{
    run_reader, GoogleCredentials, GoogleLanguageClient, ReportEmitter, RetryPolicy,
    RollingAggregate, SampleLog, StreamConsumer,
};
use hashmood_twitter::TwitterClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::view::{build_router, load_template, ViewState};

#[derive(Debug, Parser)]
#[command(name = "hashmood")]
#[command(about = "Rolling sentiment of a hashtag on the Twitter filtered stream")]
struct Cli {
    /// Bot configuration file (YAML).
    #[arg(
        long = "config.file",
        env = "HASHMOOD_CONFIG_FILE",
        default_value = "twitter.yml"
    )]
    config_file: PathBuf,

    /// Address the view server listens on.
    #[arg(
        long = "listen.addr",
        env = "HASHMOOD_LISTEN_ADDR",
        default_value = "0.0.0.0:3000"
    )]
    listen_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cli, config) = startup(std::env::args_os())?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let shared = Arc::new(
        SharedConfig::load(&cli.config_file)
            .with_context(|| format!("loading {}", cli.config_file.display()))?,
    );
    let bot = shared.snapshot();
    let term = bot.target_hashtag.clone();
    tracing::info!(
        hashtag = %term,
        config_file = %cli.config_file.display(),
        "configuration loaded"
    );

    let template = load_template(&config.templates_dir)?;
    let google = GoogleCredentials::from_file(&bot.google_credentials_file).with_context(|| {
        format!(
            "reading Google credentials {}",
            bot.google_credentials_file.display()
        )
    })?;
    let oracle = GoogleLanguageClient::new(&google, config.request_timeout_secs)?;
    let twitter = Arc::new(TwitterClient::new(
        &bot.twitter_credentials,
        config.request_timeout_secs,
    )?);
    let retry = RetryPolicy::new(config.max_retries, config.retry_backoff_base_ms);

    let stream = twitter
        .open_stream(&term)
        .await
        .context("opening filtered stream")?;
    let log = SampleLog::create(&config.output_path)
        .await
        .with_context(|| format!("creating {}", config.output_path.display()))?;

    let aggregate = Arc::new(RollingAggregate::new());
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(config.stream_buffer);

    let reader = tokio::spawn({
        let twitter = Arc::clone(&twitter);
        let term = term.clone();
        let cancel = cancel.clone();
        async move {
            let result = run_reader(&*twitter, stream, &term, tx, retry, cancel.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "stream reader failed");
            }
            cancel.cancel();
            result
        }
    });

    let consumer = tokio::spawn({
        let consumer = StreamConsumer::new(
            oracle,
            Arc::clone(&aggregate),
            log,
            config.target_lang.clone(),
        );
        let cancel = cancel.clone();
        async move {
            let result = consumer.run(rx, cancel.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "consumer failed");
            }
            cancel.cancel();
            result
        }
    });

    let emitter = Arc::new(ReportEmitter::new(
        Arc::clone(&twitter),
        Arc::clone(&aggregate),
        term.clone(),
        retry,
    ));
    let mut scheduler = scheduler::build_scheduler(
        emitter,
        Duration::from_secs(config.report_interval_secs),
    )
    .await?;

    #[cfg(unix)]
    let reload = spawn_reload_handler(
        Arc::clone(&shared),
        cli.config_file.clone(),
        term.clone(),
        cancel.clone(),
    )?;

    let app = build_router(
        ViewState {
            aggregate,
            template: Arc::from(template),
            hashtag: Arc::from(term),
        },
        &config.templates_dir,
    );
    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    tracing::info!(addr = %cli.listen_addr, "view server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    let reader_result = reader.await?;
    let consumer_result = consumer.await?;
    #[cfg(unix)]
    reload.await?;
    scheduler.shutdown().await?;

    reader_result.context("stream reader")?;
    let stats = consumer_result.context("stream consumer")?;
    tracing::info!(
        accepted = stats.accepted,
        dropped = stats.dropped(),
        "shutdown complete"
    );
    Ok(())
}

/// Load `.env` once, then read the command line and the runtime settings.
///
/// `.env` goes first so clap's `env` fallbacks can see it. Exits the process
/// on a bad command line, printing clap's usage.
fn startup<I, T>(args: I) -> anyhow::Result<(Cli, AppConfig)>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    dotenvy::dotenv().ok();
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| e.exit());
    let config = hashmood_core::load_app_config_from_env()?;
    Ok((cli, config))
}

/// Re-read the bot configuration on `SIGHUP`.
///
/// A bad file keeps the previous configuration. The stream filter is fixed
/// for the life of the process, so a changed hashtag only takes effect on
/// restart.
#[cfg(unix)]
fn spawn_reload_handler(
    shared: Arc<SharedConfig>,
    path: PathBuf,
    active_term: String,
    cancel: CancellationToken,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                }
            }

            match shared.reload(&path) {
                Ok(()) => {
                    let reloaded = shared.snapshot();
                    if reloaded.target_hashtag != active_term {
                        tracing::warn!(
                            active = %active_term,
                            configured = %reloaded.target_hashtag,
                            "config reloaded; hashtag change applies after restart"
                        );
                    } else {
                        tracing::info!(path = %path.display(), "config reloaded");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "config reload failed; keeping previous config");
                }
            }
        }
    }))
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received shutdown signal, starting graceful shutdown");
        },
        () = terminate => {
            tracing::info!("received shutdown signal, starting graceful shutdown");
        },
        () = cancel.cancelled() => {
            tracing::warn!("ingestion stopped, shutting down view server");
        },
    }
}
