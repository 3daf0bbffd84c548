use clap::Parser;
use signal_sampler::{Cli, Driver, SampleRecorder, SamplerConfig, SimClient};
use tracing::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signal_sampler=info".parse()?),
        )
        .init();

    let config = SamplerConfig::try_from(Cli::parse())?;

    info!("Signal sampler - server {}", config.client.base_url);
    info!("Signal: {}", config.driver.signal_id);
    info!("Output: {}", config.output.display());

    let recorder = SampleRecorder::initialize(&config.output)?;
    let client = SimClient::connect(&config.client).await?;
    let mut driver = Driver::new(client, recorder, config.driver);

    tokio::select! {
        () = run(&mut driver, config.max_ticks) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    let stats = driver.stats();
    info!(
        "Stopped after {} ticks: {} recorded, {} skipped, {} store failures, {} advance failures",
        stats.ticks, stats.recorded, stats.skipped, stats.store_failures, stats.advance_failures
    );

    Ok(())
}

async fn run(driver: &mut Driver, max_ticks: Option<u64>) {
    match max_ticks {
        Some(count) => {
            driver.run_ticks(count).await;
        }
        None => driver.run().await,
    }
}
