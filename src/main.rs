use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use vitality_sync::handlers;
use vitality_sync::logger;
use vitality_sync::queue::OperationType;
use vitality_sync::settings::{self, RemoteKind, SettingsUpdate};
use vitality_sync::tracker::MealType;

#[derive(Parser)]
#[command(name = "vitality-sync")]
#[command(about = "Offline-first store, sync queue and coach for the Vitality wellness tracker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize settings, local store and state
    Init {
        /// Remote backend: simulated or http
        #[arg(long)]
        remote: Option<RemoteKind>,

        /// Base URL for the http remote
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer token for the http remote
        #[arg(long)]
        token: Option<String>,

        /// Daily hydration goal in liters
        #[arg(long)]
        hydration_goal: Option<f64>,

        /// Skip the interactive onboarding
        #[arg(long)]
        non_interactive: bool,
    },

    /// Queue a raw create, update or delete operation
    Queue {
        /// Operation type: create, update or delete
        op_type: OperationType,

        /// Remote table name
        table: String,

        /// Record as JSON
        data: String,
    },

    /// Write pending operations to the remote now
    Sync,

    /// Go online and sync pending operations
    Online,

    /// Go offline; new operations stay queued locally
    Offline,

    /// Show connectivity and queue counts
    Status {
        /// List pending operations too
        #[arg(long)]
        pending: bool,
    },

    /// Flush the queue periodically in the foreground
    Watch {
        /// Seconds between flushes (default: flush_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many flushes
        #[arg(long)]
        cycles: Option<u32>,
    },

    /// Requeue a failed operation with a fresh retry budget
    Retry {
        /// Operation id
        id: String,
    },

    /// Remove synced operations from the local queue
    Prune,

    /// Manage cached values
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Log water intake in liters
    Water {
        liters: f64,
    },

    /// Log and manage meals
    Meal {
        #[command(subcommand)]
        action: MealAction,
    },

    /// Log a finished workout
    Workout {
        /// Exercise name
        exercise: String,

        /// Duration in minutes
        #[arg(short, long)]
        minutes: u32,

        /// Calories burned
        #[arg(short, long, default_value_t = 0)]
        calories: u32,
    },

    /// Log mindfulness minutes
    Mind {
        minutes: u32,
    },

    /// Show today's stats
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the coach
    Coach {
        /// Message for the coach (ignored when a request body is given)
        message: Option<String>,

        /// Name the coach uses for you
        #[arg(long)]
        name: Option<String>,

        /// Read a full JSON request body from this file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the JSON reply body
        #[arg(long)]
        raw: bool,
    },

    /// Configure sync settings
    Config {
        #[arg(long)]
        max_retries: Option<u32>,

        #[arg(long)]
        cache_ttl_secs: Option<u64>,

        #[arg(long)]
        flush_interval_secs: Option<u64>,

        #[arg(long)]
        hydration_goal: Option<f64>,

        /// Remote backend: simulated or http
        #[arg(long)]
        remote: Option<RemoteKind>,

        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        token: Option<String>,

        #[arg(long)]
        simulated_latency_ms: Option<u64>,

        #[arg(long)]
        coach_endpoint: Option<String>,

        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Edit settings through a menu
        #[arg(short, long)]
        interactive: bool,
    },

    /// View sync pass history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Delete all local data
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Cache a JSON value
    Set {
        key: String,
        data: String,

        /// TTL in seconds (default: cache_ttl_secs)
        #[arg(long, conflicts_with = "no_expiry")]
        ttl: Option<u64>,

        /// Never expire this entry
        #[arg(long)]
        no_expiry: bool,
    },

    /// Print a cached value if it has not expired
    Get {
        key: String,
    },

    /// Remove every expired entry
    ClearExpired,
}

#[derive(Subcommand)]
enum MealAction {
    /// Add a meal
    Add {
        name: String,

        #[arg(short, long)]
        calories: u32,

        /// breakfast, lunch, dinner or snack
        #[arg(short = 't', long = "type", default_value = "snack")]
        meal_type: MealType,

        /// Time of day (HH:MM)
        #[arg(long, default_value = "12:00")]
        time: String,
    },

    /// Mark a meal as eaten
    Complete {
        id: String,

        /// Mark as not eaten instead
        #[arg(long)]
        undo: bool,
    },

    /// Delete a meal
    Delete {
        id: String,
    },

    /// List logged meals
    List,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recent sync passes
    List {
        /// Maximum number of passes to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the most recent sync pass
    Last {
        /// Only consider this trigger: queued, reconnect, resume, scheduled or manual
        #[arg(long)]
        trigger: Option<String>,
    },

    /// Clear all history
    Clear,
}

fn main() -> Result<()> {
    if let Err(e) = logger::init_logger() {
        eprintln!("{} Failed to initialize logging: {e:#}", "Warning:".yellow());
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            remote,
            endpoint,
            token,
            hydration_goal,
            non_interactive,
        } => {
            let update = SettingsUpdate {
                remote,
                remote_endpoint: endpoint,
                remote_token: token,
                hydration_goal_liters: hydration_goal,
                ..Default::default()
            };
            handlers::handle_init(update, !non_interactive)?;
        }
        Commands::Queue {
            op_type,
            table,
            data,
        } => {
            handlers::handle_queue(op_type, &table, &data)?;
        }
        Commands::Sync => {
            handlers::handle_sync()?;
        }
        Commands::Online => {
            handlers::handle_connectivity(true)?;
        }
        Commands::Offline => {
            handlers::handle_connectivity(false)?;
        }
        Commands::Status { pending } => {
            handlers::handle_status(pending)?;
        }
        Commands::Watch { interval, cycles } => {
            handlers::handle_watch(interval, cycles)?;
        }
        Commands::Retry { id } => {
            handlers::handle_retry(&id)?;
        }
        Commands::Prune => {
            handlers::handle_prune()?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Set {
                key,
                data,
                ttl,
                no_expiry,
            } => {
                handlers::handle_cache_set(&key, &data, ttl, no_expiry)?;
            }
            CacheAction::Get { key } => {
                handlers::handle_cache_get(&key)?;
            }
            CacheAction::ClearExpired => {
                handlers::handle_cache_clear_expired()?;
            }
        },
        Commands::Water { liters } => {
            handlers::handle_water(liters)?;
        }
        Commands::Meal { action } => match action {
            MealAction::Add {
                name,
                calories,
                meal_type,
                time,
            } => {
                handlers::handle_meal_add(&name, calories, meal_type, &time)?;
            }
            MealAction::Complete { id, undo } => {
                handlers::handle_meal_complete(&id, !undo)?;
            }
            MealAction::Delete { id } => {
                handlers::handle_meal_delete(&id)?;
            }
            MealAction::List => {
                handlers::handle_meal_list()?;
            }
        },
        Commands::Workout {
            exercise,
            minutes,
            calories,
        } => {
            handlers::handle_workout(&exercise, minutes, calories)?;
        }
        Commands::Mind { minutes } => {
            handlers::handle_mind(minutes)?;
        }
        Commands::Stats { json } => {
            handlers::handle_stats(json)?;
        }
        Commands::Coach {
            message,
            name,
            input,
            raw,
        } => {
            handlers::handle_coach(message.as_deref(), name.as_deref(), input.as_deref(), raw)?;
        }
        Commands::Config {
            max_retries,
            cache_ttl_secs,
            flush_interval_secs,
            hydration_goal,
            remote,
            endpoint,
            token,
            simulated_latency_ms,
            coach_endpoint,
            show,
            interactive,
        } => {
            if show {
                settings::show_config()?;
            } else if interactive {
                handlers::handle_config_interactive()?;
            } else {
                settings::update_config(SettingsUpdate {
                    max_retries,
                    cache_ttl_secs,
                    flush_interval_secs,
                    hydration_goal_liters: hydration_goal,
                    remote,
                    remote_endpoint: endpoint,
                    remote_token: token,
                    simulated_latency_ms,
                    coach_endpoint,
                })?;
            }
        }
        Commands::History { action } => match action {
            HistoryAction::List { limit } => {
                handlers::handle_history_list(limit)?;
            }
            HistoryAction::Last { trigger } => {
                handlers::handle_history_last(trigger.as_deref())?;
            }
            HistoryAction::Clear => {
                handlers::handle_history_clear()?;
            }
        },
        Commands::Clear { yes } => {
            handlers::handle_clear(yes)?;
        }
    }

    Ok(())
}
