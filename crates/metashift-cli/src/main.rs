//! metashift command-line interface.
//!
//! Drives the migration plan from the shell: ingest assessment scans,
//! inspect and hand-tune the plan, simulate runs, and clean up.

mod output;
mod scan;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use metashift_core::{
    migrate::simulate_run, Classifier, PlanReport, PlanStore, RunConfig, UpgradeStrategy,
};
use output::OutputFormat;
use scan::ScanFile;

/// metastore-to-catalog migration planner and engine
#[derive(Parser, Debug)]
#[command(name = "metashift")]
#[command(version, about = "metastore-to-catalog migration planner and engine")]
pub struct Args {
    /// Path of the durable migration plan
    #[arg(short = 'p', long, default_value = "metashift.plan")]
    pub plan: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest an assessment scan file and refresh the plan
    Assess {
        /// Scan file (JSON with objects and external locations)
        scan: PathBuf,
        /// Origin-workspace tag for multi-source consolidation
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Show per-database migration progress
    Status {
        /// Output format
        #[arg(long, default_value = "table", value_enum)]
        format: OutputFormat,
    },
    /// Override a database's target catalog and database
    SetTarget {
        /// Source database to edit
        database: String,
        /// Target catalog
        catalog: String,
        /// Target database
        target_database: String,
    },
    /// Override a database's upgrade strategy
    SetStrategy {
        /// Source database to edit
        database: String,
        /// Strategy to assign
        #[arg(value_enum)]
        strategy: StrategyArg,
    },
    /// Execute a what-if run against an in-memory catalog
    Simulate {
        /// Output format
        #[arg(long, default_value = "table", value_enum)]
        format: OutputFormat,
        /// Databases processed in parallel
        #[arg(long, default_value_t = 4)]
        database_workers: usize,
        /// Tables migrated in parallel within one database
        #[arg(long, default_value_t = 4)]
        table_workers: usize,
    },
    /// Remove plan state (one database, or everything with --all)
    Cleanup {
        /// Database to remove from the plan
        database: Option<String>,
        /// Remove the whole plan
        #[arg(long, conflicts_with = "database")]
        all: bool,
    },
}

/// Strategy names accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Manual,
    InPlace,
    Ctas,
    Mixed,
}

impl From<StrategyArg> for UpgradeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Manual => UpgradeStrategy::Manual,
            StrategyArg::InPlace => UpgradeStrategy::InPlace,
            StrategyArg::Ctas => UpgradeStrategy::Ctas,
            StrategyArg::Mixed => UpgradeStrategy::Mixed,
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("metashift=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = PlanStore::open(&args.plan)?;

    match args.command {
        Command::Assess { scan, workspace } => {
            let scan = ScanFile::read(&scan)?;
            let locations = scan.locations();
            let objects = scan.into_objects()?;
            let classifier = Classifier::new(&locations);
            let assessments = classifier.refresh_plan(&store, objects, workspace.as_deref())?;
            println!("{}", output::render_assessments(&assessments));
            println!("{} database(s) assessed", assessments.len());
        }
        Command::Status { format } => {
            let report = PlanReport::project(&store)?;
            println!("{}", output::render_plan(&report, format));
        }
        Command::SetTarget {
            database,
            catalog,
            target_database,
        } => {
            let record = store.set_target(&database, &catalog, &target_database)?;
            println!(
                "{}: target set to {}.{}",
                record.database, record.target_catalog, record.target_database
            );
        }
        Command::SetStrategy { database, strategy } => {
            let record = store.set_strategy(&database, strategy.into())?;
            println!("{}: strategy set to {}", record.database, record.strategy);
        }
        Command::Simulate {
            format,
            database_workers,
            table_workers,
        } => {
            let config = RunConfig {
                database_workers,
                table_workers,
            };
            let outcome = simulate_run(&store, config)?;
            println!("{}", output::render_run(&outcome.run, format));
            println!("{}", output::render_plan(&outcome.plan, format));
        }
        Command::Cleanup { database, all } => match (database, all) {
            (Some(database), _) => {
                if store.remove_database(&database)? {
                    println!("{database}: removed from plan");
                } else {
                    println!("{database}: not in plan");
                }
            }
            (None, true) => {
                store.clear()?;
                println!("plan cleared");
            }
            (None, false) => {
                return Err("cleanup needs a database name or --all".into());
            }
        },
    }

    Ok(())
}
