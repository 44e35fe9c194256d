use clap::{Parser, Subcommand};
use wayflow::compiler::loader::load_definition_from_yaml;
use wayflow::compiler::validator::Validator;
use wayflow::dsl::samples;
use wayflow::dsl::Definition;
use wayflow::runtime::{Engine, Instance, Variables};
use wayflow::EngineConfig;
use std::path::PathBuf;
use anyhow::{Result, anyhow, bail};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a definition and report every structural problem
    Validate {
        /// Path to the definition YAML file
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Deploy a definition, start it and complete tasks in order
    Run {
        /// Path to the definition YAML file
        #[arg(long, short)]
        file: PathBuf,

        /// Initial variables (key=value)
        #[arg(long, short = 'D', value_parser = parse_key_val)]
        vars: Vec<(String, Value)>,

        /// Complete the pending task at a node: node_id[:key=value,...]
        #[arg(long, short, value_parser = parse_step)]
        complete: Vec<Step>,
    },

    /// Walk the built-in approval chain with a sequence of `pass` decisions
    Demo {
        /// 1 approves, 2 rejects
        #[arg(long, short)]
        decision: Vec<String>,
    },
}

#[derive(Debug, Clone)]
struct Step {
    node_id: String,
    vars: Vec<(String, Value)>,
}

fn parse_key_val(s: &str) -> Result<(String, Value), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].to_string();
    let val_str = &s[pos + 1..];
    // Try parsing as JSON, otherwise treat as string
    let val = serde_json::from_str(val_str).unwrap_or_else(|_| Value::String(val_str.to_string()));
    Ok((key, val))
}

fn parse_step(s: &str) -> Result<Step, String> {
    let (node_id, rest) = match s.split_once(':') {
        Some((node, rest)) => (node, rest),
        None => (s, ""),
    };
    if node_id.is_empty() {
        return Err(format!("invalid step `{}`: missing node id", s));
    }
    let vars = rest.split(',')
        .filter(|p| !p.is_empty())
        .map(parse_key_val)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Step { node_id: node_id.to_string(), vars })
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_yaml_file(p),
        None => Ok(EngineConfig::default()),
    }
}

async fn drive(engine: &Engine, definition: Definition, initial: Variables, steps: Vec<Step>) -> Result<Instance> {
    let deployed = engine.deploy(definition).await?;
    let mut instance = engine.start(&deployed.definition_id, Some(deployed.version), initial).await?;
    info!("Instance started: {}", instance.id);

    for step in steps {
        let pending = engine.list_pending(instance.id).await?;
        let task = pending.iter()
            .find(|t| t.node_id == step.node_id)
            .ok_or_else(|| {
                let waiting: Vec<&str> = pending.iter().map(|t| t.node_id.as_str()).collect();
                anyhow!("no pending task at '{}' (waiting at {:?})", step.node_id, waiting)
            })?;
        instance = engine.complete(task.id, step.vars.into_iter().collect()).await?;
    }
    Ok(instance)
}

async fn report(engine: &Engine, instance: &Instance) -> Result<()> {
    let pending = engine.list_pending(instance.id).await?;
    let summary = json!({
        "instance": instance.id,
        "definition": format!("{}@{}", instance.definition_id, instance.definition_version),
        "status": format!("{:?}", instance.status),
        "failure": instance.failure,
        "variables": instance.variables,
        "pending": pending.iter().map(|t| json!({
            "task": t.id,
            "node": t.node_id,
            "name": t.name,
            "candidate_groups": t.candidate_groups,
        })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Validate { file } => {
            let definition = load_definition_from_yaml(&file)?;
            let errors = Validator::from_config(&config).validate(&definition);
            if errors.is_empty() {
                println!("{}: ok", definition.id);
            } else {
                for e in &errors {
                    println!("{}: {}", definition.id, e);
                }
                bail!("{} validation error(s)", errors.len());
            }
        }

        Commands::Run { file, vars, complete } => {
            let engine = Engine::with_config(config);
            let definition = load_definition_from_yaml(&file)?;
            let instance = drive(&engine, definition, vars.into_iter().collect(), complete).await?;
            report(&engine, &instance).await?;
        }

        Commands::Demo { decision } => {
            let engine = Engine::with_config(config);
            let definition = samples::approval_chain();
            let deployed = engine.deploy(definition).await?;
            let mut instance = engine.start(&deployed.definition_id, None, Variables::new()).await?;

            // Stage 1 has no gateway behind it; each later stage consumes one decision.
            let mut decisions = decision.into_iter();
            while instance.is_running() {
                let pending = engine.list_pending(instance.id).await?;
                let Some(task) = pending.first() else { break };
                let vars = if task.node_id == "task1" {
                    Variables::new()
                } else {
                    match decisions.next() {
                        Some(d) => Variables::from([("pass".to_string(), Value::String(d))]),
                        None => break,
                    }
                };
                info!(node_id = %task.node_id, "Completing task");
                instance = engine.complete(task.id, vars).await?;
            }
            report(&engine, &instance).await?;
        }
    }

    Ok(())
}
