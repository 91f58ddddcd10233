mod catalog;
mod config;
mod document;
mod error;
mod export;
mod extract;
mod fetcher;
mod models;
mod pipeline;
mod registry;
mod utils;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, Unmatched};
use crate::export::DataStore;
use crate::extract::generic::GenericExtractor;
use crate::fetcher::{LiveSessions, SessionFactory};
use crate::models::{Category, Field, SchoolDescriptor};
use crate::pipeline::Pipeline;
use crate::registry::Registry;

#[derive(Parser)]
#[command(name = "lics-scraper", about = "International school website extraction", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON catalog to use instead of the built-in one
    #[arg(long, global = true, env = "LICS_CATALOG")]
    catalog: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Extract all five fields for the selected schools
    Scrape {
        /// School display name, repeatable (default: every catalog school)
        #[arg(short, long = "school", conflicts_with = "all")]
        schools: Vec<String>,

        #[arg(long)]
        all: bool,

        /// Use generic extraction for schools no site extractor matches
        #[arg(long)]
        generic: bool,

        /// Print results without writing a dataset
        #[arg(long)]
        no_export: bool,
    },

    /// List catalog schools with the extractor each one dispatches to
    Schools,

    /// Show which extractor a display name resolves to
    Dispatch { name: String },

    /// Run generic extraction of one category for one school
    Field {
        #[arg(short, long)]
        school: String,

        #[arg(short, long, value_enum)]
        category: Category,
    },

    /// List saved dataset timestamps, newest first
    Datasets,

    /// Print the newest saved dataset
    Show,
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Vec<SchoolDescriptor>> {
    match path {
        Some(p) => catalog::from_path(p).with_context(|| format!("Failed to load catalog {:?}", p)),
        None => catalog::builtin().context("Built-in catalog is malformed"),
    }
}

fn select(schools: &[SchoolDescriptor], names: &[String]) -> Vec<SchoolDescriptor> {
    if names.is_empty() {
        return schools.to_vec();
    }
    names
        .iter()
        .filter_map(|n| {
            let found = catalog::find(schools, n).cloned();
            if found.is_none() {
                warn!("`{}` is not in the catalog, skipping", n);
            }
            found
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "lics_scraper=info,warn",
        1 => "lics_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    let registry = Arc::new(Registry::builtin());

    match cli.command {
        Command::Scrape { schools, all: _, generic, no_export } => {
            let _t = utils::Timer::start("School extraction");
            if generic {
                config.pipeline.unmatched = Unmatched::Generic;
            }

            let catalog = load_catalog(cli.catalog.as_ref())?;
            let selected = select(&catalog, &schools);
            if selected.is_empty() {
                println!("No schools selected.");
                return Ok(());
            }

            let sessions: Arc<dyn SessionFactory> = Arc::new(LiveSessions::new(&config.fetcher, &config.browser)?);
            let pipeline = Pipeline::new(Arc::clone(&registry), sessions, config.pipeline.clone());
            let (records, stats) = pipeline.run(&selected).await;

            println!("{:<45} {}", "School", Field::ALL.map(|f| f.key()).join("  "));
            for record in &records {
                let cells: Vec<String> = record
                    .fields()
                    .map(|(f, r)| format!("{:<width$}", r.status(), width = f.key().len()))
                    .collect();
                println!("{:<45} {}", record.name, cells.join("  "));
            }
            println!(
                "\n{} schools | {} fields ok | {} field errors | {} teardown failures",
                stats.schools, stats.fields_ok, stats.field_errors, stats.teardown_failures
            );

            if no_export {
                let output: Vec<_> = records.iter().map(|r| r.to_output_value()).collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let saved = DataStore::new(&config.export).save(&records, &catalog)?;
                println!("Saved {:?} and {:?}", saved.csv, saved.json);
            }
        }

        Command::Schools => {
            let catalog = load_catalog(cli.catalog.as_ref())?;
            println!("Extractors: {}", registry.codes().join(", "));
            println!("{} schools:", catalog.len());
            for school in &catalog {
                let d = registry.resolve_school(school, config.pipeline.unmatched);
                let notice = d.notice.as_deref().map(|n| format!("  ({})", n)).unwrap_or_default();
                println!("  {:<45} -> {:<8} [{}]{}", school.name, d.code(), d.rule, notice);
            }
        }

        Command::Dispatch { name } => {
            let catalog = load_catalog(cli.catalog.as_ref())?;
            let d = match catalog::find(&catalog, &name) {
                Some(school) => registry.resolve_school(school, config.pipeline.unmatched),
                None => registry.resolve(&name),
            };
            println!("{} -> {} ({})", name, d.code(), d.rule);
            if let Some(notice) = d.notice {
                println!("note: {}", notice);
            }
        }

        Command::Field { school, category } => {
            let catalog = load_catalog(cli.catalog.as_ref())?;
            let Some(descriptor) = catalog::find(&catalog, &school) else {
                bail!("`{}` is not in the catalog", school);
            };

            let sessions = LiveSessions::new(&config.fetcher, &config.browser)?;
            let session = sessions.open();
            let result = GenericExtractor::new(descriptor.clone()).extract_category(category, session.as_ref()).await;
            if let Err(e) = session.close().await {
                warn!("{}: session teardown failed: {}", school, e);
            }

            info!("{} / {}: {}", descriptor.name, category, result.status());
            println!("{}", serde_json::to_string_pretty(&result.to_output_value())?);
        }

        Command::Datasets => {
            let stamps = DataStore::new(&config.export).list_datasets()?;
            if stamps.is_empty() {
                println!("No datasets yet; run `lics-scraper scrape` first.");
            } else {
                println!("{} datasets:", stamps.len());
                for s in &stamps {
                    println!("  {}", s);
                }
            }
        }

        Command::Show => match DataStore::new(&config.export).load_latest()? {
            Some((stamp, records)) => {
                println!("Dataset {} ({} schools)", stamp, records.len());
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            None => println!("No datasets yet; run `lics-scraper scrape` first."),
        },
    }

    Ok(())
}
