use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use gotham_agents::{AgentError, ItineraryAgent};
use gotham_core::{
    current_season, parse_borough_list, parse_season, BudgetTier, HotelPolicy, Pace,
    PlannerOptions, TripRequest,
};
use gotham_data::{
    generate_datasets, BoundaryCrs, CleanError, SourcePaths, Store, DEFAULT_DATA_DIR,
};
use gotham_llm::{ModelConfig, ModelError, OllamaClient, DEFAULT_HOST, DEFAULT_MODEL};
use gotham_observability::{init_tracing, AppMetrics, LogFormat};
use tracing::info;

mod interactive;

#[derive(Debug, Parser)]
#[command(name = "gotham")]
#[command(about = "New York City itinerary generator backed by a local Ollama model")]
struct Cli {
    /// Directory holding the cleaned datasets.
    #[arg(long, env = "GOTHAM_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// json or pretty
    #[arg(long, env = "GOTHAM_LOG_FORMAT", default_value = "json", value_parser = parse_log_format)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean the raw sources and write the cleaned CSV files.
    GenerateDataset {
        #[arg(long, env = "NYC_HOTEL_PATH")]
        hotels: PathBuf,
        #[arg(long, env = "NYC_BOURUGH_COORDS")]
        boroughs: PathBuf,
        #[arg(long, env = "NYC_ATTRACTIONS_PATH")]
        attractions: PathBuf,
        #[arg(long, env = "NYC_RESTAURANTS_PATH")]
        restaurants: PathBuf,
        /// auto, wgs84 or epsg2263
        #[arg(long, default_value = "auto")]
        boundary_crs: String,
    },
    /// Probe the Ollama endpoint and list its models.
    CheckModel {
        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Plan a trip. Without --days every preference is asked for on stdin.
    Plan {
        #[arg(long)]
        days: Option<u8>,
        /// Comma separated boroughs, or `all`.
        #[arg(long)]
        boroughs: Option<String>,
        #[arg(long)]
        budget: Option<String>,
        /// Month or season.
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        pace: Option<String>,
        #[arg(long, default_value = "rating")]
        hotel_policy: String,
        #[arg(long)]
        no_clustering: bool,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 120)]
        model_timeout_secs: u64,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Debug, Args)]
struct ModelArgs {
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_HOST)]
    ollama_host: String,
    #[arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    ollama_model: String,
}

impl ModelArgs {
    fn config(&self, request_timeout: Duration) -> ModelConfig {
        ModelConfig {
            host: self.ollama_host.clone(),
            model: self.ollama_model.clone(),
            request_timeout,
            ..ModelConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing("gotham_cli", cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err:#}", error_kind(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let metrics = AppMetrics::shared();

    match cli.command {
        Command::GenerateDataset {
            hotels,
            boroughs,
            attractions,
            restaurants,
            boundary_crs,
        } => {
            let crs = BoundaryCrs::parse(&boundary_crs).map_err(|reason| anyhow!(reason))?;
            let paths = SourcePaths {
                hotels,
                boroughs,
                attractions,
                restaurants,
            };
            let store = Store::csv(&cli.data_dir);

            let summary = generate_datasets(&paths, crs, &store)?;
            metrics.add_rows_dropped(summary.rows_dropped());

            println!(
                "Borough boundaries: {} ({})",
                summary.boundaries,
                summary.boundary_crs.as_str()
            );
            for report in &summary.reports {
                println!(
                    "{:<12} read {:>6}  kept {:>6}  dropped {:>5}  unknown borough {:>5}",
                    report.dataset,
                    report.rows_read,
                    report.kept,
                    report.dropped(),
                    report.unknown_borough
                );
            }
            println!("Cleaned datasets written to {}", cli.data_dir.display());
        }
        Command::CheckModel {
            timeout_secs,
            model,
        } => {
            let agent = build_agent(
                &cli.data_dir,
                model.config(Duration::from_secs(timeout_secs)),
                PlannerOptions::default(),
                metrics.clone(),
            )?;
            let report = agent.check_model(Duration::from_secs(timeout_secs)).await?;

            println!("Ollama reachable at {} (HTTP {})", report.host, report.status);
            if report.models.is_empty() {
                println!("No models pulled yet.");
            } else {
                println!("Models:");
                for name in &report.models {
                    println!("- {name}");
                }
            }
            if !report.has_configured_model() {
                println!(
                    "Configured model `{}` is not available; run `ollama pull {}`.",
                    report.configured_model, report.configured_model
                );
            }
        }
        Command::Plan {
            days,
            boroughs,
            budget,
            season,
            pace,
            hotel_policy,
            no_clustering,
            json,
            model_timeout_secs,
            model,
        } => {
            let request = match days {
                Some(days) => request_from_flags(days, boroughs, budget, season, pace)?,
                None => interactive::ask_trip_request()?,
            };
            let options = PlannerOptions {
                hotel_policy: HotelPolicy::parse(&hotel_policy)
                    .with_context(|| format!("invalid --hotel-policy `{hotel_policy}`"))?,
                cluster_by_borough: !no_clustering,
            };

            let agent = build_agent(
                &cli.data_dir,
                model.config(Duration::from_secs(model_timeout_secs)),
                options,
                metrics.clone(),
            )?;
            let outcome = agent.plan_trip(request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                if let Some(warning) = &outcome.warning {
                    eprintln!("warning: {warning}");
                }
                print!("{}", outcome.itinerary);
            }
        }
    }

    info!(metrics = ?metrics.snapshot(), "run finished");
    Ok(())
}

fn parse_log_format(raw: &str) -> std::result::Result<LogFormat, String> {
    LogFormat::parse(raw).ok_or_else(|| format!("unknown log format `{raw}`, use json or pretty"))
}

fn request_from_flags(
    days: u8,
    boroughs: Option<String>,
    budget: Option<String>,
    season: Option<String>,
    pace: Option<String>,
) -> Result<TripRequest> {
    let mut request = TripRequest::new(days);

    if let Some(raw) = boroughs {
        request.boroughs = parse_borough_list(&raw)
            .map_err(|invalid| anyhow!("unknown boroughs: {}", invalid.0.join(", ")))?;
    }
    if let Some(raw) = budget {
        request.budget =
            Some(BudgetTier::parse(&raw).with_context(|| format!("invalid --budget `{raw}`"))?);
    }
    request.season = match season {
        Some(raw) => Some(parse_season(&raw).with_context(|| format!("invalid --season `{raw}`"))?),
        None => Some(current_season(Local::now().date_naive())),
    };
    if let Some(raw) = pace {
        request.pace = Some(Pace::parse(&raw).with_context(|| format!("invalid --pace `{raw}`"))?);
    }

    Ok(request)
}

fn build_agent(
    data_dir: &Path,
    config: ModelConfig,
    options: PlannerOptions,
    metrics: Arc<AppMetrics>,
) -> Result<ItineraryAgent<Store, OllamaClient>> {
    let client = OllamaClient::new(config).context("failed to build Ollama client")?;
    let store = Store::csv(data_dir);

    Ok(ItineraryAgent::new(Arc::new(store), Arc::new(client), metrics).with_options(options))
}

fn error_kind(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<AgentError>() {
        err.kind()
    } else if let Some(err) = err.downcast_ref::<CleanError>() {
        err.kind()
    } else if let Some(err) = err.downcast_ref::<ModelError>() {
        err.kind()
    } else if err.downcast_ref::<interactive::InputClosed>().is_some() {
        "InputClosed"
    } else {
        "Error"
    }
}
