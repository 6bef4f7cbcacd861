use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wealth_scenarios::api::{
    DEFAULT_PORT, ScenarioArgs, ServerConfig, build_comparison_report, build_scenario,
    render_comparison_text, render_trajectory_text, run_http_server, scenarios_from_json,
};
use wealth_scenarios::core::project;
use wealth_scenarios::{Error, Result, logging};

#[derive(Parser, Debug)]
#[command(
    name = "wealth-scenarios",
    about = "Nominal wealth projection and side-by-side scenario comparison"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, env = "WEALTH_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Project a single scenario year by year
    Project {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, help = "Print the trajectory as JSON")]
        json: bool,
    },
    /// Compare the scenarios in a JSON file (an array of scenario objects)
    Compare {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, help = "Print the comparison report as JSON")]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve { port } => run_http_server(ServerConfig { port }).await,
        Command::Project { scenario, json } => {
            let scenario = build_scenario(scenario, 0)?;
            let trajectory = project(&scenario);
            if json {
                println!("{}", to_json(&trajectory)?);
            } else {
                print!("{}", render_trajectory_text(&scenario, &trajectory));
            }
            Ok(())
        }
        Command::Compare { file, json } => {
            let contents = std::fs::read_to_string(&file)?;
            let scenarios = scenarios_from_json(&contents)?;
            if scenarios.is_empty() {
                return Err(Error::EmptyScenarioSet);
            }
            let report = build_comparison_report(&scenarios);
            if json {
                println!("{}", to_json(&report)?);
            } else {
                print!("{}", render_comparison_text(&report));
            }
            Ok(())
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
