use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use publicadmin_sim::config::{Config, ConfigOverrides};
use publicadmin_sim::engine::{generate_scenario, simulate_outcome};
use publicadmin_sim::llm::gemini::GeminiModel;
use publicadmin_sim::llm::GenerativeModel;
use publicadmin_sim::output::csv::{result_to_csv, scenario_to_csv};
use publicadmin_sim::output::json::{read_json, render_json, write_json};
use publicadmin_sim::output::table::{
    render_result_table, render_scenario_table, render_session, render_weights_table,
};
use publicadmin_sim::report::GovernanceModel;
use publicadmin_sim::server::run_server;
use publicadmin_sim::session::Orchestrator;
use publicadmin_sim::types::{Actor, ActorWeights, Scenario, SimulationResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "publicadmin-sim",
    about = "Public administration policy simulator: government fade-out and substitution"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    model: Option<String>,
    #[arg(long = "base-url")]
    base_url: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone)]
struct WeightArgs {
    #[arg(short, long, default_value_t = 50)]
    government: i64,
    #[arg(short = 'k', long, default_value_t = 25)]
    market: i64,
    #[arg(short, long, default_value_t = 25)]
    society: i64,
}

impl WeightArgs {
    fn to_weights(&self) -> Result<ActorWeights> {
        Ok(ActorWeights::new(self.government, self.market, self.society)?)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a new case study.
    Scenario {
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Evaluate a policy mix against a saved or freshly generated case.
    Simulate {
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[command(flatten)]
        weights: WeightArgs,
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Label a policy mix without calling the model.
    Classify {
        #[command(flatten)]
        weights: WeightArgs,
    },
    /// Interactive session: load cases, move weights, run simulations.
    Play,
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        model: cli.model.clone(),
        base_url: cli.base_url.clone(),
        api_key: None,
    });

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }
    if let Commands::Classify { weights } = &cli.command {
        return print_classification(&weights.to_weights()?, cli.output);
    }

    let model: Arc<dyn GenerativeModel> = Arc::new(GeminiModel::new(
        config.gemini.resolve_api_key(),
        &config.gemini,
    )?);

    match &cli.command {
        Commands::Scenario { save } => {
            let scenario = generate_scenario(model.as_ref()).await?;
            if let Some(path) = save {
                write_json(path, &scenario)?;
                eprintln!("Saved scenario to {}", path.display());
            }
            print_scenario(&scenario, cli.output)?;
        }
        Commands::Simulate {
            scenario,
            weights,
            save,
        } => {
            let weights = weights.to_weights()?;
            let scenario: Scenario = match scenario {
                Some(path) => read_json(path)?,
                None => generate_scenario(model.as_ref()).await?,
            };
            let result = simulate_outcome(model.as_ref(), &scenario, &weights).await?;
            if let Some(path) = save {
                write_json(path, &result)?;
            }
            print_simulation(&scenario, &weights, &result, cli.output)?;
        }
        Commands::Play => run_interactive(Orchestrator::new(model)).await?,
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            let orchestrator = Orchestrator::new(model);
            if let Err(err) = orchestrator.load_scenario().await {
                warn!(error = %err, "initial scenario load failed");
            }
            run_server(config, orchestrator, addr).await?;
        }
        Commands::Classify { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(&config.redacted())?);
    }
    Ok(())
}

fn print_classification(weights: &ActorWeights, format: OutputFormat) -> Result<()> {
    let model = GovernanceModel::classify(weights);
    match format {
        OutputFormat::Table => println!("{}", render_weights_table(weights)),
        OutputFormat::Json => println!(
            "{}",
            render_json(&serde_json::json!({
                "weights": weights,
                "total": weights.total(),
                "governance_model": model,
                "governance_label": model.label(),
            }))?
        ),
        OutputFormat::Csv => println!("{},{}", model.as_slug(), model.label()),
    }
    Ok(())
}

fn print_scenario(scenario: &Scenario, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_scenario_table(scenario)),
        OutputFormat::Json => println!("{}", render_json(scenario)?),
        OutputFormat::Csv => print!("{}", scenario_to_csv(scenario)?),
    }
    Ok(())
}

fn print_simulation(
    scenario: &Scenario,
    weights: &ActorWeights,
    result: &SimulationResult,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_scenario_table(scenario));
            println!("{}", render_weights_table(weights));
            println!("{}", render_result_table(result, Some(&scenario.initial_metrics)));
        }
        OutputFormat::Json => println!("{}", render_json(result)?),
        OutputFormat::Csv => print!("{}", result_to_csv(result, Some(&scenario.initial_metrics))?),
    }
    Ok(())
}

const PLAY_HELP: &str = "commands: new | set <government|market|society> <0-100> | weights <g> <m> <s> | run | show | help | quit";

async fn run_interactive(orchestrator: Orchestrator) -> Result<()> {
    println!("正在生成公共管理案例...");
    if let Err(err) = orchestrator.load_scenario().await {
        eprintln!("{err}");
    }
    println!("{}", render_session(&orchestrator.snapshot()));
    println!("{PLAY_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = parts.first() else {
            continue;
        };
        match *command {
            "quit" | "exit" | "q" => break,
            "help" | "?" => println!("{PLAY_HELP}"),
            "show" => println!("{}", render_session(&orchestrator.snapshot())),
            "new" => {
                println!("切换案例 (New Case)...");
                if let Err(err) = orchestrator.load_scenario().await {
                    eprintln!("{err}");
                }
                println!("{}", render_session(&orchestrator.snapshot()));
            }
            "set" => match parse_set(&parts[1..]) {
                Ok((actor, value)) => match orchestrator.set_weight(actor, value) {
                    Ok(weights) => println!("{}", render_weights_table(&weights)),
                    Err(err) => eprintln!("{err}"),
                },
                Err(err) => eprintln!("{err}"),
            },
            "weights" => match parse_weights(&parts[1..]) {
                Ok(weights) => match orchestrator.set_weights(weights) {
                    Ok(weights) => println!("{}", render_weights_table(&weights)),
                    Err(err) => eprintln!("{err}"),
                },
                Err(err) => eprintln!("{err}"),
            },
            "run" => {
                println!("AI 教授推演中...");
                if let Err(err) = orchestrator.simulate().await {
                    eprintln!("{err}");
                }
                println!("{}", render_session(&orchestrator.snapshot()));
            }
            other => eprintln!("unknown command: {other}\n{PLAY_HELP}"),
        }
    }
    Ok(())
}

fn parse_set(args: &[&str]) -> Result<(Actor, i64)> {
    let [actor, value] = args else {
        return Err(anyhow!("usage: set <actor> <value>"));
    };
    let actor: Actor = actor.parse()?;
    let value: i64 = value
        .parse()
        .map_err(|e| anyhow!("invalid weight {value}: {e}"))?;
    Ok((actor, value))
}

fn parse_weights(args: &[&str]) -> Result<ActorWeights> {
    let values = args
        .iter()
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|e| anyhow!("invalid weight {raw}: {e}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let [government, market, society] = values.as_slice() else {
        return Err(anyhow!("usage: weights <government> <market> <society>"));
    };
    Ok(ActorWeights::new(*government, *market, *society)?)
}
