use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;

use crate::capabilities::Registry;
use crate::config::AppConfig;
use crate::schema::{self, ChatRequest, Provider, ToolChoice};
use crate::types::Message;

#[derive(Parser)]
#[command(name = "plugboard")]
#[command(about = "Capability registry and tool-schema shaping for LLM providers", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.plugboard/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered capabilities and their parameters
    List {
        /// Show only this capability
        name: Option<String>,
    },

    /// Print the tool schema document for a provider
    Schema {
        /// Provider (openai, azure_openai, ollama, anthropic, generic)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Invoke a capability
    Invoke {
        /// Capability name
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Print a provider request body carrying all capabilities as tools
    Request {
        /// Model name
        #[arg(short, long)]
        model: String,

        /// Provider (defaults to [schema] provider)
        #[arg(long)]
        provider: Option<String>,

        /// JSON file with an array of {role, content} messages
        #[arg(long)]
        messages: Option<PathBuf>,

        #[arg(long)]
        temperature: Option<f64>,

        #[arg(long)]
        max_tokens: Option<u32>,

        /// auto, none, or a capability name
        #[arg(long)]
        tool_choice: Option<ToolChoice>,
    },
}

/// Load the explicit config file, or the default one (created on first run).
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return Ok(AppConfig::load_from(path)?.with_env_overrides());
    }

    let config_path = AppConfig::config_path()?;
    if !config_path.exists() {
        let path = AppConfig::save_default()?;
        eprintln!("[Config] Created default config: {}", path.display());
    }
    AppConfig::load()
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn resolve_provider(requested: Option<&str>, config: &AppConfig) -> Result<Provider> {
    let name = requested.unwrap_or(&config.schema.provider);
    Ok(name.parse::<Provider>()?)
}

fn load_messages(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read messages file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse messages file: {}", path.display()))
}

/// Run one command. Returns `false` when an invocation produced a failure.
pub async fn run(command: Commands, config: &AppConfig, registry: &Registry) -> Result<bool> {
    match command {
        Commands::List { name: None } => {
            print_json(&serde_json::to_value(registry.list_capabilities())?)?;
        }
        Commands::List { name: Some(name) } => {
            let descriptor = registry
                .descriptor(&name)
                .ok_or_else(|| anyhow::anyhow!("Capability not found: {}", name))?;
            print_json(&serde_json::to_value(descriptor)?)?;
        }
        Commands::Schema { provider } => {
            let provider = provider.as_deref().unwrap_or(&config.schema.provider);
            debug!(provider = %provider, "Deriving schema");
            print_json(&schema::derive_schema_for(
                &registry.list_capabilities(),
                provider,
            )?)?;
        }
        Commands::Invoke { name, params } => {
            let result = registry.invoke_json(&name, &params).await;
            print_json(&serde_json::to_value(&result)?)?;
            if let Some(kind) = result.error_kind() {
                debug!(capability = %name, kind = %kind, "Invocation failed: {}", result.message());
            }
            return Ok(result.is_success());
        }
        Commands::Request {
            model,
            provider,
            messages,
            temperature,
            max_tokens,
            tool_choice,
        } => {
            let provider = resolve_provider(provider.as_deref(), config)?;
            let messages = match messages {
                Some(path) => load_messages(&path)?,
                None => Vec::new(),
            };
            let request = ChatRequest {
                model,
                messages,
                tools: schema::function_schemas(&registry.list_capabilities()),
                temperature,
                max_tokens,
                tool_choice,
            };
            debug!(
                provider = %provider,
                dialect = provider.dialect().renderer().name(),
                "Shaping request"
            );
            let body = schema::build_request(provider, &request)
                .context("Failed to build request body")?;
            print_json(&body)?;
        }
    }
    Ok(true)
}
