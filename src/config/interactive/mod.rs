
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::Path;

use super::{Config, ConfigError, EmbeddingConfig, GenerationConfig, Provider};
use crate::embeddings::EmbeddingClient;
use crate::generation::ChatClient;

const PROVIDERS: [Provider; 2] = [Provider::OpenAi, Provider::Ollama];

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 PND Assistant Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding Service").bold().yellow());
    eprintln!("Must match the model used to build the plan index.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Generation Service").bold().yellow());
    eprintln!("Chat model that writes the answers for citizens.");
    eprintln!();
    configure_generation(&mut config.generation)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    let k: usize = Input::new()
        .with_prompt("Passages retrieved per question")
        .default(config.retrieval.k)
        .validate_with(|input: &usize| -> Result<(), ConfigError> {
            config.retrieval.clone().set_k(*input)
        })
        .interact_text()?;
    config.retrieval.set_k(k)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());
    report_connection("Embedding service", test_embedding_connection(&config.embedding));
    report_connection(
        "Generation service",
        test_generation_connection(&config.generation),
    );

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Service:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(config.embedding.provider.as_str()).cyan()
    );
    eprintln!("  URL: {}", style(config.embedding.base_url()).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!(
        "  API key: {}",
        style(describe_api_key(config.embedding.resolve_api_key())).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Generation Service:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(config.generation.provider.as_str()).cyan()
    );
    eprintln!("  URL: {}", style(config.generation.base_url()).cyan());
    eprintln!("  Model: {}", style(&config.generation.model).cyan());
    eprintln!(
        "  Temperature: {}",
        style(config.generation.temperature).cyan()
    );
    eprintln!(
        "  API key: {}",
        style(describe_api_key(config.generation.resolve_api_key())).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top-k: {}", style(config.retrieval.k).cyan());
    eprintln!("  Index: {}", style(config.index_path().display()).cyan());
    eprintln!("  Table: {}", style(&config.retrieval.table).cyan());
    eprintln!(
        "  System prompt: {}",
        style(if config.prompt.system_template.is_some() {
            "custom"
        } else {
            "built-in"
        })
        .cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn select_provider(prompt: &str, current: Provider) -> Result<Provider> {
    let names: Vec<&str> = PROVIDERS.iter().map(|p| p.as_str()).collect();
    let default_index = PROVIDERS.iter().position(|&p| p == current).unwrap_or(0);

    let index = Select::new()
        .with_prompt(prompt)
        .default(default_index)
        .items(&names)
        .interact()?;

    Ok(PROVIDERS[index])
}

fn prompt_base_url(
    provider: Provider,
    current: Option<&str>,
    changed: bool,
) -> Result<Option<String>> {
    let default = match current {
        Some(url) if !changed => url.to_string(),
        _ => provider.default_base_url().to_string(),
    };

    let base_url: String = Input::new()
        .with_prompt("Service URL")
        .default(default)
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = EmbeddingConfig {
                provider,
                base_url: Some(input.clone()),
                ..EmbeddingConfig::default()
            };
            candidate.service_url().map(|_| ())
        })
        .interact_text()?;

    Ok(stored_base_url(provider, base_url))
}

/// URL to persist: unset when it is the provider default, so switching providers follows it
fn stored_base_url(provider: Provider, base_url: String) -> Option<String> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() || trimmed.trim_end_matches('/') == provider.default_base_url() {
        None
    } else {
        Some(base_url)
    }
}

fn prompt_model(current: &str) -> Result<String> {
    let model: String = Input::new()
        .with_prompt("Model")
        .default(current.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(model)
}

fn prompt_api_key(provider: Provider, current: Option<&str>) -> Result<Option<String>> {
    if provider == Provider::Ollama {
        return Ok(current.map(str::to_string));
    }

    let key = Password::new()
        .with_prompt("API key (leave empty to use OPENAI_API_KEY)")
        .allow_empty_password(true)
        .interact()?;

    if key.trim().is_empty() {
        Ok(current.map(str::to_string))
    } else {
        Ok(Some(key))
    }
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let provider = select_provider("Embedding provider", embedding.provider)?;
    let changed = provider != embedding.provider;

    embedding.base_url = prompt_base_url(provider, embedding.base_url.as_deref(), changed)?;
    embedding.model = prompt_model(&embedding.model)?;
    embedding.api_key = prompt_api_key(provider, embedding.api_key.as_deref())?;
    embedding.provider = provider;

    embedding.validate()?;
    Ok(())
}

fn configure_generation(generation: &mut GenerationConfig) -> Result<()> {
    let provider = select_provider("Generation provider", generation.provider)?;
    let changed = provider != generation.provider;

    generation.base_url = prompt_base_url(provider, generation.base_url.as_deref(), changed)?;
    generation.model = prompt_model(&generation.model)?;
    generation.api_key = prompt_api_key(provider, generation.api_key.as_deref())?;
    generation.provider = provider;

    let temperature: f32 = Input::new()
        .with_prompt("Temperature")
        .default(generation.temperature)
        .validate_with(|input: &f32| -> Result<(), ConfigError> {
            generation.clone().set_temperature(*input)
        })
        .interact_text()?;
    generation.set_temperature(temperature)?;

    generation.validate()?;
    Ok(())
}

fn test_embedding_connection(embedding: &EmbeddingConfig) -> crate::Result<()> {
    EmbeddingClient::new(embedding)?.ping()
}

fn test_generation_connection(generation: &GenerationConfig) -> crate::Result<()> {
    ChatClient::new(generation)?.ping()
}

fn report_connection(label: &str, result: crate::Result<()>) {
    match result {
        Ok(()) => eprintln!("{}", style(format!("✓ {} reachable", label)).green()),
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("⚠ Warning: {} check failed: {}", label, e)).yellow()
            );
            eprintln!("You can continue, but questions will fail until it is reachable.");
        }
    }
}

fn describe_api_key(key: Result<Option<String>, ConfigError>) -> String {
    match key {
        Ok(Some(key)) => mask_api_key(&key),
        Ok(None) => "not required".to_string(),
        Err(_) => "missing".to_string(),
    }
}

/// Show only the last four characters of a credential, nothing of a short one
fn mask_api_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        return "****".to_string();
    }
    let visible: String = key.chars().skip(len - 4).collect();
    format!("****{}", visible)
}
