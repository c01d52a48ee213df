use anyhow::Context;
use clap::{Parser, Subcommand};
use coagent_rs::adk::agent::{Agent, ExecuteRequest};
use coagent_rs::adk::message::Message;
use coagent_rs::coagent::replay::{ReplayScript, ScriptedEngine};
use coagent_rs::coagent::{AgentRegistry, CoagentConfig, ConfigLoader, GraphAgent};
use dotenv::dotenv;
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tokio_stream::StreamExt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded run and print the client frame stream
    Replay {
        /// Path to the recorded run
        #[arg(short, long)]
        script: String,

        /// Agent configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Thread to continue
        #[arg(short, long)]
        thread_id: Option<String>,

        /// Node the client last saw the thread at
        #[arg(short, long)]
        node: Option<String>,

        /// Client state as JSON
        #[arg(long, default_value = "{}")]
        state: String,

        /// Inbound messages as a JSON array
        #[arg(long, default_value = "[]")]
        messages: String,
    },
    /// Print the agent descriptor
    Info {
        /// Agent configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> anyhow::Result<CoagentConfig> {
    match path {
        Some(path) => ConfigLoader::load(path).with_context(|| format!("loading {}", path)),
        None => Ok(CoagentConfig::new("coagent").with_env_overrides()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Replay {
            script,
            config,
            thread_id,
            node,
            state,
            messages,
        } => {
            let config = load_config(config.as_deref())?;
            let script = ReplayScript::load(&script).with_context(|| format!("loading {}", script))?;
            let state: Value = serde_json::from_str(&state).context("parsing --state")?;
            let messages: Vec<Message> =
                serde_json::from_str(&messages).context("parsing --messages")?;

            let engine = Arc::new(ScriptedEngine::new(script));
            let registry = AgentRegistry::new();
            registry
                .register(Arc::new(GraphAgent::from_config(&config, engine)))
                .await;
            log::info!("Registered agent: {}", config.agent.name);

            let mut request = ExecuteRequest::new(state).with_messages(messages);
            request.thread_id = thread_id;
            request.node_name = node;

            let mut frames = registry.execute(&config.agent.name, request).await?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            while let Some(line) = frames.next().await {
                out.write_all(line?.as_bytes())?;
            }
            out.flush()?;
        }
        Commands::Info { config } => {
            let config = load_config(config.as_deref())?;
            let agent = GraphAgent::from_config(
                &config,
                Arc::new(ScriptedEngine::new(ReplayScript::default())),
            );
            println!("{}", serde_json::to_string_pretty(&agent.descriptor())?);
        }
    }

    Ok(())
}
