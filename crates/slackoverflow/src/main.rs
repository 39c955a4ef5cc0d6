//! SlackOverflow CLI - mirror a tagged Stack Exchange feed into Slack.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgGroup, Args, Parser, Subcommand};
use notify::{SlackClient, SlackConfig};
use stackexchange::{Client, ClientConfig};
use store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slackoverflow::report;
use slackoverflow::watch::WATCH_INTERVAL;
use slackoverflow::{Config, Engine, EngineSettings, Paths, Scheduler, WatchState};

/// SlackOverflow - post new Stack Exchange questions to Slack and keep them current.
#[derive(Parser)]
#[command(name = "slackoverflow")]
#[command(about = "Mirror a tagged Stack Exchange question feed into Slack")]
#[command(version)]
pub struct Cli {
    /// Directory holding slackoverflow.yaml and the database (default ~/.slackoverflow)
    #[arg(long, global = true, env = "SLACKOVERFLOW_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print query parameter tables before requests
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full sync cycle, once or periodically
    Run {
        /// Keep running and sync every --interval-secs
        #[arg(long)]
        keep_alive: bool,

        /// Seconds between cycles with --keep-alive
        #[arg(long, default_value = "60")]
        interval_secs: u64,

        /// Abort a cycle that runs longer than this
        #[arg(long, default_value = "300")]
        cycle_timeout_secs: u64,
    },

    /// Stack Exchange commands
    #[command(name = "stackexchange")]
    StackExchange {
        #[command(subcommand)]
        command: StackExchangeCommand,
    },

    /// Slack commands
    Slack {
        #[command(subcommand)]
        command: SlackCommand,
    },

    /// Print the loaded configuration with secrets masked
    Config,

    /// Check the configuration for problems
    Validate,
}

#[derive(Subcommand)]
pub enum StackExchangeCommand {
    /// Fetch questions into the local store
    Questions(FetchArgs),

    /// Print new questions every minute without storing or posting them
    Watch,
}

#[derive(Args)]
#[command(group(ArgGroup::new("action").required(true)))]
pub struct FetchArgs {
    /// Fetch questions created since the last run
    #[arg(long, group = "action")]
    get: bool,

    /// Refresh the tracked questions
    #[arg(long, group = "action")]
    update: bool,

    /// Both --get and --update
    #[arg(long, group = "action")]
    sync: bool,
}

#[derive(Subcommand)]
pub enum SlackCommand {
    /// Post and update tracked questions
    Questions(ChatArgs),

    /// List channels visible to the token
    Channels,
}

#[derive(Args)]
#[command(group(ArgGroup::new("action").required(true)))]
pub struct ChatArgs {
    /// Post tracked questions that were not posted yet
    #[arg(long, group = "action")]
    post_new: bool,

    /// Refresh posted messages and retire old ones
    #[arg(long, group = "action")]
    update_old: bool,

    /// Both --post-new and --update-old
    #[arg(long, group = "action")]
    sync_slack: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("slackoverflow=debug,stackexchange=debug,store=debug,notify=debug,info")
    } else {
        EnvFilter::new("slackoverflow=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let paths = Paths::resolve(cli.config_path.as_deref())?;
    debug!(dir = %paths.dir.display(), "Resolved config directory");

    match cli.command {
        Commands::Config => {
            let config = load_config(&paths)?;
            report::print_section(&format!("Configuration ({})", paths.config_file.display()));
            print!("{}", serde_yaml::to_string(&config.redacted())?);
        }

        Commands::Validate => {
            let config = load_config(&paths)?;
            match config.validate() {
                Ok(()) => report::print_success("Configuration is valid"),
                Err(slackoverflow::ConfigError::Invalid(problems)) => {
                    for problem in &problems {
                        report::print_error(problem);
                    }
                    bail!("{} configuration problem(s)", problems.len());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Run {
            keep_alive,
            interval_secs,
            cycle_timeout_secs,
        } => {
            let config = load_config(&paths)?;
            config.validate()?;
            require_stackexchange(&config)?;

            let cancel = shutdown_on_ctrl_c();
            let (mut engine, client) = build_engine(&config, &paths, &cancel)?;
            if cli.debug {
                print_queries(&engine, &config)?;
            }

            let scheduler = Scheduler::new(
                Duration::from_secs(interval_secs),
                Duration::from_secs(cycle_timeout_secs),
                cancel.clone(),
            );

            if keep_alive {
                let summary = scheduler
                    .run(&mut engine, report::print_cycle_result)
                    .await;
                report::print_info(&format!(
                    "Ran {} cycle(s), {} timed out, {} with errors",
                    summary.cycles, summary.timed_out, summary.with_errors
                ));
            } else {
                let result = scheduler.run_once(&mut engine).await;
                report::print_cycle_result(&result);
                if !result?.is_clean() {
                    bail!("Sync cycle finished with errors");
                }
            }
            report::print_quota(client.quota());
        }

        Commands::StackExchange { command } => {
            let config = load_config(&paths)?;
            require_stackexchange(&config)?;
            let cancel = shutdown_on_ctrl_c();

            match command {
                StackExchangeCommand::Questions(args) => {
                    let (mut engine, client) = build_engine(&config, &paths, &cancel)?;
                    if cli.debug {
                        print_queries(&engine, &config)?;
                    }

                    if args.get || args.sync {
                        report::print_step("Fetching new questions");
                        let outcome = engine.sync_new().await?;
                        report::print_sync("New questions", &outcome);
                    }
                    if args.update || args.sync {
                        report::print_step("Refreshing tracked questions");
                        let outcome = engine.sync_updates().await?;
                        report::print_sync("Tracked questions", &outcome);
                    }
                    report::print_quota(client.quota());
                }

                StackExchangeCommand::Watch => {
                    let client = stackexchange_client(&config)?;
                    watch(&config, &client, &cancel, cli.debug).await;
                    report::print_quota(client.quota());
                }
            }
        }

        Commands::Slack { command } => {
            let config = load_config(&paths)?;
            let slack = slack_client(&config)?;
            if !slack.enabled() {
                bail!("Slack token is not configured (set slack.token or SLACK_TOKEN)");
            }

            match command {
                SlackCommand::Channels => {
                    let channels = slack
                        .list_channels()
                        .await
                        .context("Failed to list Slack channels")?;
                    report::print_channels(&channels);
                }

                SlackCommand::Questions(args) => {
                    let cancel = shutdown_on_ctrl_c();
                    let (engine, _) = build_engine(&config, &paths, &cancel)?;
                    let mut engine = engine.with_sink(Arc::new(slack));

                    if args.post_new || args.sync_slack {
                        report::print_step("Posting new questions");
                        let outcome = engine.post_new().await?;
                        report::print_chat("Posts", &outcome);
                    }
                    if args.update_old || args.sync_slack {
                        report::print_step("Updating posted questions");
                        let outcome = engine.update_tracked().await?;
                        report::print_chat("Updates", &outcome);
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_config(paths: &Paths) -> Result<Config> {
    if !paths.config_file.exists() {
        bail!(
            "No configuration at {}. Create it or pass --config-path.",
            paths.config_file.display()
        );
    }
    Config::load(&paths.config_file)
        .with_context(|| format!("Failed to load {}", paths.config_file.display()))
}

fn require_stackexchange(config: &Config) -> Result<()> {
    if !config.stackexchange.enabled {
        bail!("Stack Exchange is disabled in the configuration");
    }
    Ok(())
}

fn stackexchange_client(config: &Config) -> Result<Client> {
    let section = &config.stackexchange;
    Client::new(ClientConfig {
        api_host: section.api_host.clone(),
        api_version: section.api_version.clone(),
        api_key: section.key.clone(),
        timeout: section.request_timeout(),
    })
    .context("Failed to create Stack Exchange client")
}

fn slack_client(config: &Config) -> Result<SlackClient> {
    SlackClient::new(SlackConfig {
        api_host: config.slack.api_host.clone(),
        token: config.slack.token.clone(),
        timeout: config.stackexchange.request_timeout(),
    })
    .context("Failed to create Slack client")
}

/// Engine over the on-disk store. The Slack sink is attached when Slack is
/// enabled and has a token.
fn build_engine(
    config: &Config,
    paths: &Paths,
    cancel: &CancellationToken,
) -> Result<(Engine, Arc<Client>)> {
    let store = Store::open(&paths.database_file)
        .with_context(|| format!("Failed to open {}", paths.database_file.display()))?;
    let client = Arc::new(stackexchange_client(config)?);

    let mut engine = Engine::new(
        Arc::new(store),
        Arc::clone(&client) as Arc<dyn slackoverflow::QuestionSource>,
        EngineSettings::from_config(config),
    )
    .with_cancellation(cancel.clone());

    if config.slack.enabled {
        let slack = slack_client(config)?;
        if slack.enabled() {
            engine = engine.with_sink(Arc::new(slack));
        }
    }

    Ok((engine, client))
}

fn print_queries(engine: &Engine, config: &Config) -> Result<()> {
    let host = config.stackexchange.api_host.as_str();
    let version = config.stackexchange.api_version.as_str();

    let (from, _) = engine.resolve_watermark(Utc::now())?;
    report::print_query(
        "New questions",
        &engine.new_questions_query(from),
        host,
        version,
    );

    let ids = engine
        .store()
        .tracked_ids(engine.settings().questions_to_watch)?;
    if !ids.is_empty() {
        report::print_query(
            "Tracked questions",
            &engine.tracked_query(&ids),
            host,
            version,
        );
    }
    Ok(())
}

async fn watch(config: &Config, client: &Client, cancel: &CancellationToken, debug: bool) {
    let mut state = WatchState::new(&EngineSettings::from_config(config), Utc::now());
    let mut ticker = tokio::time::interval(WATCH_INTERVAL);

    report::print_section(&format!(
        "Watching {} (since {})",
        config.stackexchange.site,
        state.since().format("%H:%M:%S")
    ));

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("Shutdown requested, stopping watch");
                break;
            }
            _ = ticker.tick() => {}
        }

        if debug {
            report::print_query(
                "Watch",
                &state.query(client),
                &config.stackexchange.api_host,
                &config.stackexchange.api_version,
            );
        }
        match state.poll(client).await {
            Ok(items) => report::print_watch_rows(&items),
            Err(e) => report::print_error(&format!("Watch poll failed: {e}")),
        }
    }
}

/// Cancel the returned token on Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, finishing current step");
            token.cancel();
        }
    });
    cancel
}
