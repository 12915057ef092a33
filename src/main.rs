/// Design Commons server
///
/// Loads configuration from the environment, starts the background jobs and
/// serves the REST API (and optionally a static frontend).
use anyhow::Context;
use design_commons::{
    config::{LogFormat, LoggingConfig},
    jobs, server, AppContext, ServerConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    init_logging(&config.logging);

    print_banner();

    let ctx = AppContext::new(config)
        .await
        .context("Failed to initialize application")?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    let job_handles = scheduler.start();

    server::serve((*ctx).clone()).await.context("Server failed")?;

    for handle in job_handles {
        handle.abort();
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "design_commons={0},tower_http={0}",
            logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn print_banner() {
    println!(
        r#"
    ____            _               ______
   / __ \___  _____(_)___ _____    / ____/___  ____ ___  ____ ___  ____  ____  _____
  / / / / _ \/ ___/ / __ `/ __ \  / /   / __ \/ __ `__ \/ __ `__ \/ __ \/ __ \/ ___/
 / /_/ /  __(__  ) / /_/ / / / / / /___/ /_/ / / / / / / / / / / / /_/ / / / (__  )
/_____/\___/____/_/\__, /_/ /_/  \____/\____/_/ /_/ /_/_/ /_/ /_/\____/_/ /_/____/
                  /____/
        Community server for design teachers v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
