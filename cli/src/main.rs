use clap::Parser;
mod commands;
use commands::cli;
use page_state_core::api::{self as core_api, AppConfig, DecodeError, LoggingConfig, PageStateError};
use std::path::PathBuf;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> anyhow::Result<i32> {
    let args = cli::Args::parse();
    let cfg = match args.config.as_deref() {
        Some(path) => core_api::load_from_path(path),
        None => core_api::load_default(),
    }
    .map_err(|e| PageStateError::Config(format!("{e:#}")))?;
    init_tracing(&cfg.logging).map_err(PageStateError::Config)?;

    dispatch(args.command, &cfg).await?;
    Ok(0)
}

fn exit_code_for_error(e: &anyhow::Error) -> i32 {
    // 0: success
    // 11: config error
    // 12: value could not be decoded or encoded
    // 20: IO error
    // 50: internal/uncategorized
    if e.downcast_ref::<DecodeError>().is_some() {
        return 12;
    }
    if let Some(pe) = e.downcast_ref::<PageStateError>() {
        return match pe {
            PageStateError::Config(_) => 11,
            PageStateError::Decode(_) | PageStateError::Encode { .. } => 12,
            _ => 50,
        };
    }
    if e.downcast_ref::<std::io::Error>().is_some() {
        return 20;
    }
    50
}

async fn dispatch(cmd: cli::Commands, cfg: &AppConfig) -> anyhow::Result<()> {
    match cmd {
        cli::Commands::Encode(args) => commands::codec::handle_encode(args),
        cli::Commands::Decode(args) => commands::codec::handle_decode(args),
        cli::Commands::Inspect(args) => commands::inspect::handle_inspect(args),
        cli::Commands::Demo(args) => commands::demo::handle_demo(args, cfg).await,
    }
}

/// Directives used when neither `RUST_LOG` nor the config sets a level.
const FALLBACK_FILTER: &str = "warn,page_state=info,pstate=info";

fn log_filter(logging: &LoggingConfig) -> Result<EnvFilter, String> {
    if let Ok(v) = std::env::var("RUST_LOG") {
        if !v.trim().is_empty() {
            return Ok(EnvFilter::from_default_env());
        }
    }
    let directives = match logging.level.trim() {
        "" => FALLBACK_FILTER,
        level => level,
    };
    EnvFilter::try_new(directives).map_err(|e| format!("invalid log level '{directives}': {e}"))
}

/// Per-process log file under the configured directory, else `$TMP/page-state`.
fn log_file_writer(logging: &LoggingConfig) -> Result<NonBlocking, String> {
    let dir = logging
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("page-state"));
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("create log dir {} failed: {e}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, format!("pstate.{}.log", std::process::id()));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }
    if !logging.console && !logging.file {
        return Err("logging disabled for both console and file".to_string());
    }

    let filter = log_filter(logging)?;
    let file_writer = logging.file.then(|| log_file_writer(logging)).transpose()?;

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });
    let file_layer = file_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(
        target: "pstate",
        stage = "tracing.init",
        console = logging.console,
        file = logging.file,
        level = %logging.level
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_map_to_data_exit_code() {
        let bare = anyhow::Error::from(DecodeError::new("page", "abc", "int", "invalid digit"));
        assert_eq!(exit_code_for_error(&bare), 12);

        let wrapped = anyhow::Error::from(PageStateError::from(DecodeError::new(
            "page", "abc", "int", "invalid digit",
        )));
        assert_eq!(exit_code_for_error(&wrapped), 12);
    }

    #[test]
    fn config_and_io_errors_have_their_own_codes() {
        let cfg = anyhow::Error::from(PageStateError::Config("bad".into()));
        assert_eq!(exit_code_for_error(&cfg), 11);

        let io = anyhow::Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(exit_code_for_error(&io), 20);
        assert_eq!(exit_code_for_error(&anyhow::anyhow!("other")), 50);
    }

    #[test]
    fn blank_level_uses_project_targets() {
        let logging = LoggingConfig {
            level: "  ".to_string(),
            ..LoggingConfig::default()
        };
        if std::env::var("RUST_LOG").map_or(true, |v| v.trim().is_empty()) {
            let filter = log_filter(&logging).unwrap();
            assert!(filter.to_string().contains("page_state=info"));
        }
    }
}
