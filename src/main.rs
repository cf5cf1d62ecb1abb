mod audio;
mod config;
mod controller;
mod error;
mod logging;
mod model;
mod view;

use std::io;
use std::sync::Arc;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::Mutex;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use view::AppView;
use audio::RodioDevice;
use config::AppConfig;
use controller::AppController;
use model::{AppModel, JsonLibrary, ProxyDelivery};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== tunebox starting ===");

    let config = AppConfig::load()?;
    let library = Arc::new(JsonLibrary::open(config.library_path.clone())?);
    let (device, device_events) = RodioDevice::spawn(config.default_volume)?;

    let delivery = Arc::new(ProxyDelivery::new(config.asset_base_url.clone()));
    let model = Arc::new(Mutex::new(AppModel::new(&config, delivery)));
    let controller = AppController::new(
        model.clone(),
        Arc::new(device),
        library,
        config.playback.clone(),
    );

    controller.start_device_event_listener(device_events);

    // Library and resume bootstrap load in the background while the UI comes up
    let controller_for_init = controller.clone();
    tokio::spawn(async move {
        controller_for_init.load_library().await;
    });

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, controller.clone()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    controller.close_player().await;
    tracing::info!("tunebox shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        let should_quit = {
            let mut model_guard = model.lock().await;

            // Auto-clear old errors (after 5 seconds)
            model_guard.auto_clear_old_errors();

            terminal.draw(|f| AppView::render(f, &model_guard))?;
            model_guard.should_quit()
        };

        if should_quit {
            break;
        }

        // Handle input with shorter poll time for smoother UI updates
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }
    }

    Ok(())
}
