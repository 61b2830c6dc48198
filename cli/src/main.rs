mod commands;
mod config;
mod openfoodfacts;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    CatalogKind, cmd_catalog_add, cmd_catalog_delete, cmd_catalog_list, cmd_day, cmd_import_yaml,
    cmd_log, cmd_meal_add, cmd_meal_delete, cmd_meal_edit, cmd_meal_list, cmd_search,
    cmd_summary, cmd_unlog,
};
use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use nosh_core::models::NutrientProfile;
use nosh_core::service::NoshService;

const DEFAULT_LOG_FILTER: &str = "nosh=warn,nosh_core=warn";

#[derive(Parser)]
#[command(
    name = "nosh",
    version,
    about = "A local nutrition ledger: foods, meals, activities, and a daily diary"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the food catalog
    Food {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Manage the activity catalog (values are burned, per repetition)
    Activity {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Compose and manage meals
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Search `OpenFoodFacts` and add results to your food catalog
    Search {
        /// Search query
        query: String,
        /// Print the first page as JSON instead of starting the pager
        #[arg(long)]
        json: bool,
    },
    /// Log a food, meal, or activity to the diary
    Log {
        /// What to log: food, meal, or activity
        kind: String,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show one day's diary with nutrition per entry and in total
    Day {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a diary entry by its position in `nosh day`
    Unlog {
        /// Position of the entry (1-based)
        position: usize,
        /// Date of the entry (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Average daily nutrition over the last N days
    Summary {
        /// Number of days in the window, ending today
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import data from external sources
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Add a record
    Add {
        /// Name (stored lower-case)
        name: String,
        calories: f64,
        fat: f64,
        carbs: f64,
        protein: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List records, optionally filtered by a shell-style pattern (e.g. 'ap*')
    List {
        pattern: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record
    Delete {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Create a new meal in the interactive editor
    Add { name: String },
    /// Edit an existing meal in the interactive editor
    Edit { name: String },
    /// List meals with their contents and totals
    List {
        pattern: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal
    Delete {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import foods.yaml, meals.yaml, activities.yaml and diary.yaml from a directory
    Yaml {
        /// Directory holding the YAML files
        dir: std::path::PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env("NOSH_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var("NOSH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn catalog_command(svc: &mut NoshService, kind: CatalogKind, command: CatalogCommands) -> Result<()> {
    match command {
        CatalogCommands::Add {
            name,
            calories,
            fat,
            carbs,
            protein,
            json,
        } => cmd_catalog_add(
            svc,
            kind,
            &name,
            NutrientProfile::new(calories, fat, carbs, protein),
            json,
        ),
        CatalogCommands::List { pattern, json } => {
            cmd_catalog_list(svc, kind, pattern.as_deref(), json)
        }
        CatalogCommands::Delete { name, json } => cmd_catalog_delete(svc, kind, &name, json),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut svc = NoshService::open(&config.db_path)?;
    tracing::debug!(db = %config.db_path.display(), "ledger opened");
    for w in svc.load_warnings() {
        eprintln!(
            "Warning: stored {} could not be read ({}); starting from an empty one",
            w.collection, w.message
        );
    }

    match cli.command {
        Commands::Food { command } => catalog_command(&mut svc, CatalogKind::Food, command),
        Commands::Activity { command } => {
            catalog_command(&mut svc, CatalogKind::Activity, command)
        }
        Commands::Meal { command } => match command {
            MealCommands::Add { name } => cmd_meal_add(&mut svc, &name),
            MealCommands::Edit { name } => cmd_meal_edit(&mut svc, &name),
            MealCommands::List { pattern, json } => cmd_meal_list(&svc, pattern.as_deref(), json),
            MealCommands::Delete { name, json } => cmd_meal_delete(&mut svc, &name, json),
        },
        Commands::Search { query, json } => {
            let off = OpenFoodFactsClient::new()?;
            cmd_search(&mut svc, &off, &query, config.search_page_size, json)
        }
        Commands::Log { kind, date } => cmd_log(&mut svc, &kind, date, config.browse_page_size),
        Commands::Day { date, json } => cmd_day(&svc, date, json),
        Commands::Unlog {
            position,
            date,
            json,
        } => cmd_unlog(&mut svc, position, date, json),
        Commands::Summary { days, json } => cmd_summary(&svc, days, json),
        Commands::Import { command } => match command {
            ImportCommands::Yaml { dir, dry_run, json } => {
                cmd_import_yaml(&mut svc, &dir, dry_run, json)
            }
        },
    }
}
