use anyhow::Result;
use plunge::app::{App, AppDeps};
use plunge::console::{Command, HELP, parse_command};
use plunge::logging::{get_logger, init_logging};
use plunge::notify::NotificationDispatcher;
use plunge::rates::{FetchStatus, OctopusClient};
use plunge::refresh::RefreshDecision;
use plunge::settings::{Settings, SettingsStore};
use plunge::slots::format_slot;
use plunge::timer::{SystemClock, TokioTimers};
use plunge::Config;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;
    let logger = get_logger("main");
    logger.info(&format!("Plunge {} starting up", env!("APP_VERSION")));

    let mut settings = SettingsStore::new(&config.settings_file, Settings::from_env());
    if let Err(e) = settings.load() {
        logger.warn(&format!("Could not load settings, using defaults: {}", e));
    }

    let clock = Arc::new(SystemClock);
    let deps = AppDeps {
        api: Arc::new(OctopusClient::new(&config.api)?),
        dispatcher: Arc::new(NotificationDispatcher::from_config(&config.notifications)?),
        clock: clock.clone(),
        timers: Arc::new(TokioTimers::new(clock)),
    };
    let fetch_on_start = config.refresh.fetch_on_start;
    let mut app = App::new(config, settings, deps)?;

    // Deliver fired alerts in the background
    let outbox_task = app
        .take_outbox()
        .map(|outbox| tokio::spawn(app.dispatcher().run(outbox)));

    if fetch_on_start && let Err(e) = app.refresh_forced().await {
        println!("{}", e.user_message());
    }
    print_banner(&app);
    println!("Type 'help' for commands.");

    let mut current = app.subscribe_current();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                // Any input means the user is looking again
                app.on_visible();
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => handle_command(&mut app, command).await,
                    Ok(None) => {}
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            changed = current.changed() => {
                if changed.is_err() {
                    break;
                }
                let slot = current.borrow_and_update().clone();
                // The slot may have moved into a new local day
                app.reconcile_alerts();
                if let Some(rate) = slot {
                    logger.info(&format!(
                        "Current slot {} at {:.2} p/kWh",
                        format_slot(rate.valid_from, rate.valid_to, app.timezone()),
                        rate.value_inc_vat
                    ));
                }
            }
            _ = &mut shutdown => {
                logger.info("Shutdown signal received");
                break;
            }
        }
    }

    app.shutdown();
    drop(app);
    if let Some(task) = outbox_task {
        task.abort();
    }
    logger.info("Shutdown complete");
    Ok(())
}

async fn handle_command(app: &mut App, command: Command) {
    match command {
        Command::Refresh => match app.refresh().await {
            Ok(RefreshDecision::Fetch) => print_banner(app),
            Ok(RefreshDecision::UpToDate(message)) => println!("{}", message),
            Ok(RefreshDecision::Busy) => println!("Loading..."),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Fetch => match app.refresh_forced().await {
            Ok(count) => {
                println!("Fetched {} rates.", count);
                print_banner(app);
            }
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Show(day) => print!("{}", app.overview(day)),
        Command::Negative => print_banner(app),
        Command::Now => match app.current_slot() {
            Some(rate) => println!(
                "Now {}  {:.2} p/kWh",
                format_slot(rate.valid_from, rate.valid_to, app.timezone()),
                rate.value_inc_vat
            ),
            None => println!("No rate for the current slot."),
        },
        Command::Notify(enabled) => match app.set_notifications_enabled(enabled) {
            Ok(()) => println!(
                "Notifications {} ({} alerts armed).",
                if enabled { "enabled" } else { "disabled" },
                app.armed_alerts()
            ),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Set { key, value } => match app.update_setting(&key, &value) {
            Ok(()) => println!("Settings saved."),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Reset => match app.reset_settings() {
            Ok(()) => println!("Settings reset to defaults."),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Settings => {
            let s = app.settings();
            let masked = if s.api_key.is_empty() { "" } else { "********" };
            println!("apiKey: {}", masked);
            println!("mpan: {}", s.mpan);
            println!("serial: {}", s.serial);
            println!("agilePlanVersion: {}", s.agile_plan_version);
            println!("region: {}", s.region);
            println!("ofgemCapRate: {:.2}", s.ofgem_cap_rate);
            println!("notificationsEnabled: {}", s.notifications_enabled);
        }
        Command::Status => {
            let state = app.rate_state();
            let status = match state.status() {
                FetchStatus::Idle => "idle".to_string(),
                FetchStatus::Loading => "loading".to_string(),
                FetchStatus::Error => format!("error: {}", state.error.unwrap_or_default()),
            };
            println!(
                "{} rates stored, {}, {} alerts armed.",
                state.rates.len(),
                status,
                app.armed_alerts()
            );
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn print_banner(app: &App) {
    let lines = app.banner();
    if lines.is_empty() {
        return;
    }
    println!("Negative prices!");
    for line in lines {
        println!("  {}", line);
    }
}
