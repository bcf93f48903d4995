//! Memored demo
//!
//! Starts a coordinator, attaches a set of participants and runs a
//! store/read load against the shared cache while the coordinator reports
//! its size.

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memored::{Config, Coordinator, SetupOptions, SharedCache};

/// Main entry point for the Memored demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Start the coordinator with purge settings
/// 4. Walk one participant through store, read and expiry
/// 5. Run the load participants and the size reporter
/// 6. Stop on completion or on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memored=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Memored demo");

    let config = Config::from_env();
    info!(
        "Configuration loaded: participants={}, entry_ttl={}ms, purge_interval={}ms, duration={}s",
        config.participants, config.entry_ttl_ms, config.purge_interval_ms, config.run_duration_secs
    );

    let coordinator = Coordinator::start(SetupOptions::from_config(&config)).await?;

    walkthrough(coordinator.attach()?.into_cache()).await?;

    let mut load = JoinSet::new();
    for index in 0..config.participants {
        let cache = coordinator.attach()?.into_cache();
        load.spawn(run_participant(index, cache, config.clone()));
    }

    let reporter = tokio::spawn(report_size(
        coordinator.cache(),
        Duration::from_secs(config.report_interval_secs.max(1)),
    ));

    let interrupted = tokio::select! {
        _ = wait_for_load(&mut load) => false,
        _ = shutdown_signal() => true,
    };
    if interrupted {
        load.abort_all();
        warn!("Load aborted");
    } else {
        info!("Load finished");
    }

    reporter.abort();
    info!("Final cache size: {}", coordinator.cache().size().await?);
    coordinator.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Stores two characters, one of them with a one second TTL, and shows the
/// second one is gone once the TTL has passed.
async fn walkthrough(cache: SharedCache) -> Result<()> {
    let han = json!({ "firstname": "Han", "lastname": "Solo" });
    let luke = json!({ "firstname": "Luke", "lastname": "Skywalker" });

    cache.store("character1", han, None).await?;
    info!("Value stored!");
    if let Some(hit) = cache.read("character1").await? {
        info!("Read value: {}", hit.value);
    }

    if let Some(expires_at) = cache
        .store("character2", luke, Some(Duration::from_secs(1)))
        .await?
    {
        let until = DateTime::<Utc>::from_timestamp_millis(expires_at as i64)
            .map(|time| time.to_rfc3339())
            .unwrap_or_else(|| expires_at.to_string());
        info!("Value stored until: {}", until);
    }

    tokio::time::sleep(Duration::from_millis(1050)).await;
    let gone = cache.read("character2").await?.is_none();
    info!("Value is gone? {}", gone);
    Ok(())
}

/// Stores a fresh entry each iteration and reads back the previous one,
/// returning the average read latency.
async fn run_participant(index: usize, cache: SharedCache, config: Config) -> Result<Duration> {
    let ttl = Duration::from_millis(config.entry_ttl_ms);
    let pause = Duration::from_millis(config.iteration_interval_ms);
    let deadline = Instant::now() + Duration::from_secs(config.run_duration_secs);

    let mut counter: u64 = 0;
    let mut total_read = Duration::ZERO;

    while Instant::now() < deadline {
        let key = format!("{}_{}", index, counter);
        let user = json!({
            "id": key,
            "firstName": format!("user-{}", counter),
            "email": format!("user{}.{}@example.com", index, counter),
        });
        cache.store(key, user, Some(ttl)).await?;

        let started = Instant::now();
        if counter > 0 {
            cache.read(format!("{}_{}", index, counter - 1)).await?;
        }
        total_read += started.elapsed();

        counter += 1;
        tokio::time::sleep(pause).await;
    }

    let average = total_read / counter.max(1) as u32;
    info!(participant = index, iterations = counter, "Average read time: {:?}", average);
    Ok(average)
}

async fn wait_for_load(load: &mut JoinSet<Result<Duration>>) {
    while let Some(joined) = load.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!("Participant failed: {}", err),
            Err(err) => warn!("Participant task ended abnormally: {}", err),
        }
    }
}

async fn report_size(cache: SharedCache, every: Duration) {
    loop {
        tokio::time::sleep(every).await;
        match cache.size().await {
            Ok(size) => info!("Cache entries count: {}", size),
            Err(err) => {
                warn!("Size report failed: {}", err);
                break;
            }
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
