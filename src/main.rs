use emg_mouse::domain::settings::{Settings, SettingsService};
use emg_mouse::infrastructure::logging;
use emg_mouse::session::SessionOutcome;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let settings_service = SettingsService::new();
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting EMG Mouse");
    if let Some(path) = settings_service.path() {
        info!("Settings file: {}", path.display());
    }
    if let Some(e) = settings_service.load_error() {
        warn!("{:#}, using defaults", e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(settings));
    // Stdin reads may still be parked on a blocking thread
    runtime.shutdown_background();

    match result {
        Ok(outcome) if !outcome.is_failure() => {
            info!("Session ended: {:?}", outcome);
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            error!("Session ended: {:?}", outcome);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
async fn run(settings: Settings) -> anyhow::Result<SessionOutcome> {
    use emg_mouse::infrastructure::bluetooth::WinRtPlatform;
    use emg_mouse::infrastructure::input_simulator::InputSimulator;
    use emg_mouse::presentation::console::StdinConsole;
    use emg_mouse::session::SessionController;
    use std::sync::Arc;

    let controller = SessionController::new(
        Arc::new(WinRtPlatform::new()),
        Arc::new(InputSimulator::new()),
        settings,
    );

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            stop.send_replace(true);
        }
    });

    let mut console = StdinConsole::new();
    Ok(controller.run(&mut console).await)
}

#[cfg(not(windows))]
async fn run(_settings: Settings) -> anyhow::Result<SessionOutcome> {
    anyhow::bail!("No Bluetooth backend is available on this platform")
}
