// hoopslog entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr)
// 2. Load config, copying defaults on first run
// 3. Run the summary pipeline against the configured database

use hoopslog_app::config;
use hoopslog_app::pipeline;

use anyhow::Context;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("hoopslog starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: database={}, window={} games, last {} days",
        config.db_path, config.report.window_size, config.report.last_days
    );

    // 3. Run
    let summary = pipeline::run_summary_pipeline(&config).context("summary pipeline failed")?;
    if summary.unrecognized_rows > 0 {
        info!(
            "{} log rows had unrecognized season labels and were excluded",
            summary.unrecognized_rows
        );
    }
    for path in &summary.exports {
        info!("wrote {}", path.display());
    }
    info!("hoopslog finished");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopslog=info,hoopslog_app=info,hoopslog_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
