//! Headless CLI driver: agent start/run/run-all/list/history/pause/resume
//! (§6). Exit code 0 on success, 1 on any agent failure (for `run-all`,
//! 1 iff any agent failed).

use std::path::PathBuf;
use std::sync::Arc;

use bctb::config::{
    initial_profile_name, load_default_workspace_config, resolve_workspace_root,
};
use bctb::errors::Result;
use bctb::event_bus::NullBus;
use bctb::llm::build_provider;
use bctb::runtime::{run_all, AgentRuntime};
use bctb::tools::ToolHandlers;
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(
    name = "bctb",
    about = "Autonomous monitoring agents over Business Central application telemetry",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Agent lifecycle and run commands.
    #[command(subcommand)]
    Agent(AgentCommands),
}

#[derive(Subcommand, Debug)]
enum AgentCommands {
    /// Create a new agent with the given natural-language instruction.
    Start {
        instruction: String,
        #[arg(long)]
        name: String,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Run one ReAct cycle for a single agent.
    Run {
        name: String,
        /// Run once and exit (currently the only supported mode).
        #[arg(long)]
        once: bool,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        #[arg(short = 'p', long = "profile")]
        profile: Option<String>,
    },
    /// Run one ReAct cycle for every agent in the workspace.
    RunAll {
        #[arg(long)]
        once: bool,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        #[arg(short = 'p', long = "profile")]
        profile: Option<String>,
    },
    /// List every agent and its status.
    List {
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Show recent run-log filenames for an agent.
    History {
        name: String,
        #[arg(short = 'l', long = "limit")]
        limit: Option<usize>,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Pause an agent so `run`/`run-all` refuse to execute it.
    Pause {
        name: String,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Resume a paused agent.
    Resume {
        name: String,
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
}

async fn build_handlers(
    workspace_root: &std::path::Path,
    config_path: Option<&std::path::Path>,
    profile_override: Option<&str>,
) -> Result<ToolHandlers> {
    let config = load_default_workspace_config(config_path)?;
    let active_profile = profile_override
        .map(str::to_string)
        .unwrap_or_else(|| initial_profile_name(&config));
    ToolHandlers::new(
        workspace_root.to_path_buf(),
        config,
        active_profile,
        Arc::new(NullBus::default()),
    )
}

async fn run_one(name: &str, config: Option<PathBuf>, profile: Option<String>) -> i32 {
    let workspace_root = match resolve_workspace_root(config.as_deref()) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let mut tools = match build_handlers(&workspace_root, config.as_deref(), profile.as_deref()).await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let workspace_config = tools.config.clone();
    let provider = match build_provider(&workspace_config.agents.llm) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let defaults = workspace_config.agents.defaults.clone();
    let actions_config = workspace_config.agents.actions.clone();
    let mut runtime = AgentRuntime::new(
        workspace_root,
        defaults,
        actions_config,
        provider.as_ref(),
        &mut tools,
    );
    match runtime.run(name, None).await {
        Ok(log) => {
            println!("{}", serde_json::to_string_pretty(&log).unwrap_or_default());
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

async fn run_all_agents(config: Option<PathBuf>, profile: Option<String>) -> i32 {
    let workspace_root = match resolve_workspace_root(config.as_deref()) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let mut tools = match build_handlers(&workspace_root, config.as_deref(), profile.as_deref()).await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let workspace_config = tools.config.clone();
    let provider = match build_provider(&workspace_config.agents.llm) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let defaults = workspace_config.agents.defaults.clone();
    let actions_config = workspace_config.agents.actions.clone();

    let results = run_all(
        workspace_root,
        &defaults,
        &actions_config,
        provider.as_ref(),
        &mut tools,
    )
    .await;

    let mut exit_code = 0;
    for (name, result) in results {
        match result {
            Ok(log) => {
                println!("{}", serde_json::to_string_pretty(&log).unwrap_or_default());
            }
            Err(e) => {
                eprintln!("agent '{name}' failed: {e}");
                exit_code = 1;
            }
        }
    }
    exit_code
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Agent(AgentCommands::Start { instruction, name, config }) => {
            match resolve_workspace_root(config.as_deref()) {
                Ok(root) => match bctb::context::create_agent(&root, &name, &instruction) {
                    Ok(state) => {
                        println!("{}", serde_json::to_string_pretty(&state).unwrap_or_default());
                        0
                    }
                    Err(e) => {
                        eprintln!("error: {e}");
                        1
                    }
                },
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
        Commands::Agent(AgentCommands::Run { name, once: _, config, profile }) => {
            run_one(&name, config, profile).await
        }
        Commands::Agent(AgentCommands::RunAll { once: _, config, profile }) => {
            run_all_agents(config, profile).await
        }
        Commands::Agent(AgentCommands::List { config }) => match resolve_workspace_root(config.as_deref()) {
            Ok(root) => match bctb::context::list_agents(&root) {
                Ok(agents) => {
                    println!("{}", serde_json::to_string_pretty(&json!(agents)).unwrap_or_default());
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            },
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        },
        Commands::Agent(AgentCommands::History { name, limit, config }) => {
            match resolve_workspace_root(config.as_deref()) {
                Ok(root) => match bctb::context::get_run_history(&root, &name, limit) {
                    Ok(files) => {
                        println!("{}", serde_json::to_string_pretty(&json!(files)).unwrap_or_default());
                        0
                    }
                    Err(e) => {
                        eprintln!("error: {e}");
                        1
                    }
                },
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
        Commands::Agent(AgentCommands::Pause { name, config }) => {
            match resolve_workspace_root(config.as_deref()) {
                Ok(root) => match bctb::context::set_agent_status(
                    &root,
                    &name,
                    bctb::types::AgentStatus::Paused,
                ) {
                    Ok(state) => {
                        println!("{}", serde_json::to_string_pretty(&state).unwrap_or_default());
                        0
                    }
                    Err(e) => {
                        eprintln!("error: {e}");
                        1
                    }
                },
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
        Commands::Agent(AgentCommands::Resume { name, config }) => {
            match resolve_workspace_root(config.as_deref()) {
                Ok(root) => match bctb::context::set_agent_status(
                    &root,
                    &name,
                    bctb::types::AgentStatus::Active,
                ) {
                    Ok(state) => {
                        println!("{}", serde_json::to_string_pretty(&state).unwrap_or_default());
                        0
                    }
                    Err(e) => {
                        eprintln!("error: {e}");
                        1
                    }
                },
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
    };
    std::process::exit(exit_code);
}
