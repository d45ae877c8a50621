//! TV-out service
//!
//! A polling task turns HDMI and screen state changes into platform signals
//! and hands them over a channel to the controller loop, which owns the
//! driver session until shutdown.

use crate::commands;
use anyhow::Result;
use devparts_config::DevPartsConfig;
use devparts_hal::{
    DriverFactory, NativeTvOutFactory, PlatformSignal, ScreenProbe, SignalWatcher, SysfsChannel,
    TvOutController,
};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const SIGNAL_QUEUE: usize = 16;

/// Boot entry point: restore settings, then serve TV-out until shutdown
pub async fn run_daemon(config: &DevPartsConfig) -> Result<()> {
    let start = Instant::now();

    match commands::restore(config) {
        Ok(count) => info!("Restored {} control points in {:?}", count, start.elapsed()),
        Err(e) => warn!("Settings restore failed: {:#}", e),
    }

    if !config.tvout.enabled {
        info!("TV-out service disabled");
        return Ok(());
    }

    let channel = commands::channel(config);
    let probe = match &config.tvout.screen_probe {
        Some(probe) => Some(ScreenProbe::from(probe)),
        None => ScreenProbe::detect(&channel),
    };
    match &probe {
        Some(probe) => debug!("Screen state from {}", probe.path.display()),
        None => warn!("No screen state file found, screen on/off will not be tracked"),
    }

    let watcher = SignalWatcher::new(channel, config.tvout.hdmi_state_path.clone(), probe);
    let period = Duration::from_millis(config.daemon.poll_interval_ms);
    let (signals, poller) = spawn_watcher(watcher, period);

    let factory = NativeTvOutFactory::new(&config.tvout.library_path);
    info!("TV-out service started, driver {}", factory.library().display());
    let mut controller = TvOutController::new(factory);

    run_controller(&mut controller, signals, shutdown_signal()).await;
    poller.abort();

    info!("TV-out service stopped");
    Ok(())
}

/// Poll the watcher on a fixed period, forwarding every signal
pub fn spawn_watcher<C: SysfsChannel + 'static>(
    mut watcher: SignalWatcher<C>,
    period: Duration,
) -> (mpsc::Receiver<PlatformSignal>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(SIGNAL_QUEUE);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            for signal in watcher.poll() {
                debug!("Platform signal: {}", signal);
                if tx.send(signal).await.is_err() {
                    return;
                }
            }
        }
    });

    (rx, handle)
}

/// Apply signals in arrival order until the source closes or shutdown fires.
///
/// The driver session is released on the way out.
pub async fn run_controller<F: DriverFactory>(
    controller: &mut TvOutController<F>,
    mut signals: mpsc::Receiver<PlatformSignal>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(signal) => {
                    controller.handle(signal);
                }
                None => {
                    debug!("Signal source closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    controller.release();
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
