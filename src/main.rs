use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use training_dashboard_lib::config::DashboardConfig;
use training_dashboard_lib::render::{render_page, render_text};
use training_dashboard_lib::{init_tracing, server, show_dashboard};

#[derive(Parser)]
#[command(name = "training-dashboard")]
#[command(version, about = "Training metrics dashboard for trackio databases", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (default: first *.db under the search root)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory searched for a database when --database is not given
    #[arg(long, global = true)]
    search_root: Option<PathBuf>,

    /// Write JSON logs to this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the dashboard page to a file
    Render {
        #[arg(long, default_value = "dashboard.html")]
        out: PathBuf,
    },
    /// Print status and per-cohort stats
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Serve the dashboard; every page load refreshes
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(database) = cli.database {
        config.database = Some(database);
    }
    if let Some(search_root) = cli.search_root {
        config.search_root = search_root;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }

    init_tracing(config.log_dir.as_deref(), cli.verbose).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Render { out } => {
            let view = show_dashboard(&config);
            std::fs::write(&out, render_page(&view))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("{}", view.status);
            println!("wrote {}", out.display());
        }
        Commands::Summary { json } => {
            let view = show_dashboard(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", render_text(&view));
            }
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            println!("serving dashboard on http://{}", config.bind);
            server::serve(&config)?;
        }
    }

    Ok(())
}
