use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scoreboard::board::builtin::register_builtins;
use scoreboard::board::{BoardCatalog, BoardContext, BoardManager};
use scoreboard::config::Config;
use scoreboard::context::AppContext;
use scoreboard::display::{ConsoleDisplay, Display};
use scoreboard::input;
use scoreboard::rotation::{Mode, RenderLoop, RotationController};
use scoreboard::scheduler::{CallableRegistry, JobDescription, JobScheduler, SchedulerManager, TokioScheduler};
use scoreboard::watcher::{ConfigWatcher, ReloadHandler};
use scoreboard::workers::{Feeds, StandardWorkers, WorkerEnv, WorkerKind};

mod cli;

use cli::{Cli, Commands};

fn setup_logging(to_stderr: bool, level: &str) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if to_stderr {
        builder.init();
        return Ok(());
    }

    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scoreboard")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("scoreboard.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Catalog holding the built-in boards, with a warning for every
/// configured board it cannot build.
fn build_catalog(config: &Config) -> BoardCatalog {
    let mut catalog = BoardCatalog::new();
    register_builtins(&mut catalog, config);

    let missing = catalog.missing(&config.boards.referenced_ids());
    if !missing.is_empty() {
        log::warn!("Configured boards with no implementation: {:?}", missing);
        eprintln!("{} no board registered for: {}", "Warning:".yellow(), missing.join(", "));
    }
    catalog
}

fn build_scheduler(
    runtime: &tokio::runtime::Runtime,
    config: &Config,
    app: &Arc<AppContext>,
    display: &Arc<dyn Display>,
) -> Arc<SchedulerManager> {
    let scheduler: Arc<dyn JobScheduler> = Arc::new(TokioScheduler::new(runtime.handle().clone()));
    let env = WorkerEnv {
        app: app.clone(),
        display: display.clone(),
        scheduler,
    };
    let workers = StandardWorkers::new(Feeds::from_config(config));
    let mut callables = CallableRegistry::new();
    workers.register_callables(config, &env, &mut callables);
    Arc::new(SchedulerManager::new(Arc::new(workers), env, callables))
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("scoreboard-jobs")
        .enable_all()
        .build()
        .context("Failed to build job runtime")
}

fn handle_run_command(
    config_path: Option<&PathBuf>,
    config: Config,
    mode: Option<&str>,
    jobs: Option<&Path>,
    no_watch: bool,
    remote: bool,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let runtime = build_runtime()?;
    let app = Arc::new(AppContext::new(config.clone()));
    if let Some(mode) = mode {
        app.set_mode(mode.parse::<Mode>()?);
    }
    let display: Arc<dyn Display> = Arc::new(ConsoleDisplay::new(
        config.display.width,
        config.display.height,
        config.display.brightness,
    ));

    let catalog = build_catalog(&config);
    let manager = build_scheduler(&runtime, &config, &app, &display);

    let jobs_json = jobs
        .map(|path| fs::read_to_string(path).with_context(|| format!("Failed to read job list {}", path.display())))
        .transpose()?;
    let job_ids = manager.schedule_jobs(&config, jobs_json.as_deref());
    info!("Scheduled jobs: {:?}", job_ids);

    let (reload_tx, reload_rx) = crossbeam_channel::unbounded();
    let _watcher = match (no_watch, Config::locate(config_path)) {
        (true, _) => None,
        (false, None) => {
            log::warn!("No config file to watch, hot reload disabled");
            None
        }
        (false, Some(path)) => {
            let handler = ReloadHandler::new(&path, config.board_config_dir.as_deref(), app.clone(), reload_tx.clone())
                .with_scheduler(manager.clone());
            Some(ConfigWatcher::start(handler).context("Failed to start config watcher")?)
        }
    };

    if remote || config.remote.enabled {
        input::spawn_reader(BufReader::new(io::stdin()), app.clone()).context("Failed to start remote input")?;
    }

    let shutdown = app.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.stop();
        }
    });

    let mut controller = RotationController::new(BoardManager::new(catalog), BoardContext::new(app.clone(), display));
    controller.warm_up(config.boards.sequence(app.mode()));

    println!("{} mode {}", "Scoreboard running:".green(), app.mode().to_string().cyan());
    let result = RenderLoop::new(controller, reload_rx).run();

    if let Err(e) = manager.scheduler().remove_all_jobs() {
        log::warn!("Failed to clear jobs on shutdown: {}", e);
    }
    runtime.shutdown_timeout(Duration::from_secs(2));
    result.context("Render loop failed")
}

fn handle_check_config_command(config: &Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    println!("{}", "Configuration OK".green());
    for mode in Mode::ALL {
        println!("  {:<13} {}", mode.to_string().cyan(), config.boards.sequence(mode).join(", "));
    }
    let workers: Vec<&str> = WorkerKind::planned(config).into_iter().map(WorkerKind::label).collect();
    if workers.is_empty() {
        println!("  {}", "No background workers enabled".dimmed());
    } else {
        println!("  {} {}", "workers:".cyan(), workers.join(", "));
    }

    let missing = build_catalog(config).missing(&config.boards.referenced_ids());
    if !missing.is_empty() {
        return Err(eyre!("No board registered for: {}", missing.join(", ")));
    }
    Ok(())
}

fn handle_boards_command(config: &Config) -> Result<()> {
    let catalog = build_catalog(config);
    let referenced = config.boards.referenced_ids();

    println!("{}", "Registered boards:".green());
    for id in catalog.ids() {
        let marker = if referenced.contains(&id) { "*".green() } else { " ".normal() };
        println!("  {} {}", marker, id);
    }
    for id in catalog.missing(&referenced) {
        println!("  {} {} {}", "!".red(), id, "(not registered)".dimmed());
    }
    Ok(())
}

fn handle_jobs_command(config: &Config, import: Option<&Path>) -> Result<()> {
    let Some(path) = import else {
        println!("{}", "Jobs for this configuration:".green());
        for kind in WorkerKind::planned(config) {
            println!("  {:<16} {}", kind.job_match().key().cyan(), kind.label());
        }
        return Ok(());
    };

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read job list {}", path.display()))?;
    let records = JobDescription::decode_list(&content).context("Failed to parse job list")?;

    let runtime = build_runtime()?;
    let app = Arc::new(AppContext::new(config.clone()));
    let display: Arc<dyn Display> = Arc::new(ConsoleDisplay::new(
        config.display.width,
        config.display.height,
        config.display.brightness,
    ));
    let manager = build_scheduler(&runtime, config, &app, &display);

    let mut failures = 0;
    for (index, record) in records {
        let description = match record {
            Ok(description) => description,
            Err(e) => {
                failures += 1;
                println!("  {} {:<24} {}", "skip".red(), format!("record {}", index), e);
                continue;
            }
        };
        let label = description.label().to_string();
        match manager.build_imported(description) {
            Ok(spec) => println!("  {} {:<24} {}", "ok".green(), spec.id, spec.trigger),
            Err(e) => {
                failures += 1;
                println!("  {} {:<24} {}", "skip".red(), label, e);
            }
        }
    }
    println!("{}", "Available callables:".cyan());
    for reference in manager.callables().references() {
        println!("  {}", reference);
    }

    if failures > 0 {
        println!("{}", format!("{} job(s) would be skipped", failures).yellow());
    }
    Ok(())
}

fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match cli.command.clone().unwrap_or_default() {
        Commands::Run {
            mode,
            jobs,
            no_watch,
            remote,
        } => handle_run_command(
            cli.config.as_ref(),
            config,
            mode.as_deref(),
            jobs.as_deref(),
            no_watch,
            remote,
        ),
        Commands::CheckConfig => handle_check_config_command(&config),
        Commands::Boards => handle_boards_command(&config),
        Commands::Jobs { import } => handle_jobs_command(&config, import.as_deref()),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the configured level is known
    let level = match (cli.is_verbose(), config.log_level.as_deref()) {
        (true, _) => "debug",
        (false, Some(level)) => level,
        (false, None) => "info",
    }
    .to_string();
    setup_logging(cli.log_to_stderr, &level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).context("Application failed")?;

    Ok(())
}
