pub mod types;
pub mod config;
pub mod error;
pub mod data;
pub mod processing;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive pharmacy finder
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the pharmacies collecting the given categories
    List {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Medicine category; repeat for more (extra ones past the limit are dropped)
        #[arg(long = "category", value_name = "CATEGORY")]
        categories: Vec<String>,
    },
    /// Print every collected medicine category
    Categories {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

/// Terminal rendering of one selection: prompt, or banner + table + location notice.
fn list_report(outcome: &processing::Outcome) -> String {
    if outcome.selection.is_empty() {
        return format!("{}\n", render::NO_SELECTION_PROMPT);
    }

    let mut report = format!(
        "{}\n{}",
        render::selection_banner(&outcome.selection, outcome.matches.len()),
        render::render_table_text(&outcome.matches)
    );
    if render::map_view(&outcome.matches).is_none() {
        report.push_str(render::NO_LOCATION_NOTICE);
        report.push('\n');
    }
    report
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            info!("Serving with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            // Populate the dataset before accepting requests
            let dataset = data::Dataset::new(app_config.input.clone());
            dataset.load()?;

            server::start_server(app_config, dataset).await?;
        }
        Commands::List { config, categories } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let records = data::load_data(&app_config.input)?;

            let outcome = processing::evaluate(
                &records,
                &categories,
                app_config.selection.max_selected,
            );

            if let Some(warning) = &outcome.selection.warning {
                eprintln!("{}", warning);
            }
            print!("{}", list_report(&outcome));
        }
        Commands::Categories { config } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let records = data::load_data(&app_config.input)?;
            for category in processing::derive_categories(&records) {
                println!("{}", category);
            }
        }
    }

    Ok(())
}
