//! G-Sync Test - Main Entry Point
//!
//! Draws a vertical bar sweeping across the screen at constant simulated
//! speed while the frame delivery rate oscillates between adjustable bounds,
//! so V-Sync and adaptive sync behavior can be compared by eye.
//!
//! Keys: Esc/Q quit, Up/Down change the max rate, PageUp/PageDown change the
//! min rate, V toggles V-Sync, G toggles G-Sync.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

use gsync_core::config::WindowConfig;
use gsync_core::{Clock, Config, ThreadSleeper};
use gsync_pacing::{
    FrameContext, FrameLoop, FrameObserver, FrameRateController, FrameStats, InputCommands,
    InputSource, SyncModes, status_line,
};
use gsync_platform::{InputState, Window};
use gsync_renderer::{PresentationEngine, VulkanBackend};

struct App {
    window_config: WindowConfig,
    window: Option<Window>,
    setup_error: Option<gsync_core::Error>,
    input: InputState,
    exiting: bool,
}

impl App {
    fn new(window_config: WindowConfig) -> Self {
        Self {
            window_config,
            window: None,
            setup_error: None,
            input: InputState::new(),
            exiting: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && self.setup_error.is_none() {
            match Window::new(event_loop, &self.window_config) {
                Ok(window) => self.window = Some(window),
                Err(e) => {
                    error!("Failed to create window: {}", e);
                    self.setup_error = Some(e);
                }
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.input.request_close();
            }
            WindowEvent::Resized(size) => {
                // The swapchain keeps its extent; see DESIGN.md.
                info!("Window resized to {}x{}", size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.on_key_pressed(key);
                    } else {
                        self.input.on_key_released(key);
                    }
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        debug!("Event loop exiting");
        self.exiting = true;
    }
}

/// Pumps pending window events on every poll.
struct WinitInput {
    event_loop: EventLoop<()>,
    app: App,
    rate_step: u32,
}

impl InputSource for WinitInput {
    fn poll(&mut self) -> InputCommands {
        self.app.input.begin_frame();
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app);

        let mut commands = self.app.input.commands(self.rate_step);
        if matches!(status, PumpStatus::Exit(_)) || self.app.exiting {
            commands.quit = true;
        }
        commands
    }
}

/// Logs the status line and mirrors it to the window title.
struct StatusReporter<'a> {
    window: &'a Window,
    title: String,
    stats: FrameStats,
}

impl FrameObserver for StatusReporter<'_> {
    fn on_frame(
        &mut self,
        context: &FrameContext,
        controller: &FrameRateController,
        modes: &SyncModes,
    ) {
        if let Some(measured) = self.stats.record(context.delta_sec) {
            let line = status_line(controller, modes, Some(measured));
            info!(target: "gsync::status", "{}", line);
            self.window.set_title(&format!("{} | {}", self.title, line));
        }
    }
}

fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::discover(config_path.as_deref()).context("Failed to load configuration")?;

    gsync_core::init_logging_with(&config.logging.filter);
    info!("Starting G-Sync Test");
    debug!("Configuration: {:?}", config);

    let mut event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config.window.clone());

    let window = loop {
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut app) {
            bail!("Event loop exited with code {} before a window was created", code);
        }
        if let Some(e) = app.setup_error.take() {
            return Err(e).context("Failed to create window");
        }
        if let Some(window) = app.window.take() {
            break window;
        }
    };

    let refresh_hint = config
        .pacing
        .refresh_rate_override
        .or_else(|| window.refresh_rate_hint())
        .unwrap_or(0.0);
    info!("Display refresh rate hint: {:.1} Hz", refresh_hint);

    let backend = VulkanBackend::new(&window, &config.presentation)
        .context("Failed to initialize Vulkan")?;
    let mut engine = PresentationEngine::new(backend, &config.presentation);

    let presentation = &config.presentation;
    let mut frame_loop = FrameLoop::new(
        Clock::monotonic(),
        FrameRateController::new(refresh_hint),
        SyncModes::new(
            presentation.vsync,
            presentation.adaptive_sync_available,
            presentation.adaptive_sync_enabled,
        ),
        config.pacing.animation_duration_sec,
    );

    let mut input = WinitInput {
        event_loop,
        app,
        rate_step: config.pacing.rate_step,
    };
    let mut reporter = StatusReporter {
        window: &window,
        title: config.window.title.clone(),
        stats: FrameStats::new(config.pacing.status_interval_sec),
    };

    let result = frame_loop.run(&mut input, &mut engine, &mut ThreadSleeper, &mut reporter);

    // GPU resources go before the window, whatever the loop result.
    let shutdown = engine.shutdown();
    drop(window);

    let frames = result.context("Frame loop failed")?;
    shutdown.context("Failed to shut down presentation")?;
    info!("Exited cleanly after {} frames", frames);
    Ok(())
}
