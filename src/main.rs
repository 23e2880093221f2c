use clap::Parser;
use log::info;
use radarscope::audio::LogToneSink;
use radarscope::cli::Cli;
use radarscope::config::ApplicationConfig;
use radarscope::engine::RadarEngine;
use radarscope::ingestor::{FeedPoller, FeedUpdate, HttpFeed, RawFeedLog, ReplayFeed};
use radarscope::logging::setup_logging;
use radarscope::preferences::MemoryPreferences;
use radarscope::renderer::TerminalRenderer;
use radarscope::scope::{ScopeDriver, ScopeTask};
use radarscope::task_manager::{TaskID, TaskManager};

const TERMINAL_REFRESH: std::time::Duration = std::time::Duration::from_secs(1);

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.logging_level);

    let application_config =
        ApplicationConfig::load(cli.config_file.as_ref()).unwrap_or_else(|e| {
            log::error!("{e}");
            log::error!("Config error. Exiting.");
            std::process::exit(1);
        });
    info!("Main: Application started.");

    let (feed_sender, feed_receiver): (
        crossbeam_channel::Sender<FeedUpdate>,
        crossbeam_channel::Receiver<FeedUpdate>,
    ) = crossbeam_channel::unbounded();

    let mut task_manager = TaskManager::new();
    start_feed_poller(&cli, &application_config, feed_sender, &mut task_manager);

    let engine = RadarEngine::new(
        &application_config,
        Box::new(MemoryPreferences::new()),
        Box::new(LogToneSink),
    );
    let driver = ScopeDriver::new(engine, feed_receiver);

    if let Some(driver) = run_window(cli.gui, driver) {
        let scope_task_id = run_headless(&application_config, driver, &mut task_manager);
        if let Some(duration) = cli.duration {
            std::thread::sleep(std::time::Duration::from_secs(duration));
            task_manager.stop_all_tasks();
        }
        task_manager.wait_on_task_finish(scope_task_id);
    }

    task_manager.stop_all_tasks();
    task_manager.wait_on_all_tasks();
    info!("Main: Program finished.");
}

fn start_feed_poller(
    cli: &Cli,
    config: &ApplicationConfig,
    sender: crossbeam_channel::Sender<FeedUpdate>,
    task_manager: &mut TaskManager,
) {
    let raw_log = cli
        .feed
        .log_input_data_stream
        .as_ref()
        .and_then(|path| {
            RawFeedLog::create(path)
                .map_err(|e| log::error!("Not recording the feed: {e}"))
                .ok()
        });
    let period = config.feed.refresh_interval();

    match &cli.feed.read_input_data_stream {
        Some(path) => {
            let source = ReplayFeed::open(path).unwrap_or_else(|e| {
                log::error!("{e}");
                std::process::exit(1);
            });
            task_manager.add_task("feed", FeedPoller::new(source, sender, raw_log), period);
        }
        None => {
            let source = HttpFeed::new(&config.feed).unwrap_or_else(|e| {
                log::error!("Error constructing feed client: {e}");
                std::process::exit(1);
            });
            task_manager.add_task("feed", FeedPoller::new(source, sender, raw_log), period);
        }
    }
}

fn run_headless(
    config: &ApplicationConfig,
    driver: ScopeDriver,
    task_manager: &mut TaskManager,
) -> TaskID {
    let scope_task = ScopeTask::new(driver);
    let renderer = TerminalRenderer::new(scope_task.get_scope_viewer());
    let scope_task_id = task_manager.add_task(
        "scope",
        scope_task,
        std::time::Duration::from_millis(config.radar.frame_interval_ms.max(1)),
    );
    task_manager.add_task("terminal", renderer, TERMINAL_REFRESH);
    scope_task_id
}

/// Runs the scope window when asked for. Hands the driver back when the
/// terminal scope should run instead.
#[cfg(feature = "gui")]
fn run_window(requested: bool, driver: ScopeDriver) -> Option<ScopeDriver> {
    if !requested {
        return Some(driver);
    }
    if let Err(e) = radarscope::gui::run(driver) {
        log::error!("Scope window failed: {e}");
    }
    None
}

#[cfg(not(feature = "gui"))]
fn run_window(requested: bool, driver: ScopeDriver) -> Option<ScopeDriver> {
    if requested {
        log::warn!("Built without the `gui` feature, falling back to the terminal scope");
    }
    Some(driver)
}
