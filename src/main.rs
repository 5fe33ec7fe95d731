use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::FmtSubscriber;

use rfv_segmenter::{export, report, ResultCache};

#[derive(Parser)]
#[command(name = "rfv-segmenter")]
#[command(about = "RFV customer segmentation over purchase logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a purchase log and write the classified table
    Analyze {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "rfv.csv")]
        out: PathBuf,
    },
    /// Print the strongest customers and group counts
    Score {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Emit a machine-readable summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let mut cache = ResultCache::new();

    match cli.command {
        Commands::Analyze { csv, out } => {
            let bytes = read_input(&csv)?;
            let table = cache.get_or_compute(&bytes)?;
            export::write_csv_file(table, &out)?;

            println!("Reference date: {}", table.reference_date);
            println!("Classified {} customers.", table.customers.len());
            println!("Customers per action:");
            for (action, count) in report::action_counts(table) {
                println!("- {action}: {count}");
            }
            println!("Table written to {}.", out.display());
        }
        Commands::Score { csv, limit, json } => {
            let bytes = read_input(&csv)?;
            let table = cache.get_or_compute(&bytes)?;

            if json {
                let summary = json!({
                    "reference_date": table.reference_date.to_string(),
                    "customers": table.customers.len(),
                    "quartiles": table.quartiles,
                    "segments": report::segment_counts(table),
                    "actions": report::action_counts(table),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("Reference date: {}", table.reference_date);
            let best = report::top_best_customers(table, limit);
            if best.is_empty() {
                println!("No customers scored AAA in this dataset.");
            } else {
                println!("Top AAA customers by value:");
                for customer in best {
                    println!(
                        "- {} spent {:.2} across {} purchases (last purchase {} days ago)",
                        customer.customer_id,
                        customer.value,
                        customer.frequency,
                        customer.recency_days
                    );
                }
            }

            println!();
            println!("Customers per RFV group:");
            for (code, count) in report::segment_counts(table) {
                println!("- {code}: {count}");
            }
        }
        Commands::Report { csv, out } => {
            let bytes = read_input(&csv)?;
            let table = cache.get_or_compute(&bytes)?;
            let report = report::build_report(table);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
