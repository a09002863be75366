use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use std::path::Path;
use tracing::{info, warn};

use crate::chat::{ChatTurn, respond};
use crate::config::Config;
use crate::index::VectorStore;
use crate::pipeline::AnswerPipeline;

const EXIT_WORDS: [&str; 3] = ["salir", "exit", "quit"];

/// Answer a single question and print it with its citation line
#[inline]
pub async fn ask(config_dir: &Path, question: &str) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let pipeline = AnswerPipeline::from_config(&config)
        .await
        .context("Failed to initialize answer pipeline")?;

    let answer = pipeline
        .answer(question)
        .await
        .context("Failed to answer question")?;

    println!("{}", answer.render());
    Ok(())
}

/// Turn-based chat in the terminal. An empty line or `salir` ends the session.
#[inline]
pub async fn chat(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let pipeline = AnswerPipeline::from_config(&config)
        .await
        .context("Failed to initialize answer pipeline")?;

    eprintln!(
        "{}",
        style("🇨🇴 Asistente del Plan Nacional de Desarrollo").bold().cyan()
    );
    eprintln!("Escribe tu pregunta. Deja la línea vacía o escribe 'salir' para terminar.");
    eprintln!();

    let mut history: Vec<ChatTurn> = Vec::new();
    loop {
        let question: String = Input::new()
            .with_prompt("Pregunta")
            .allow_empty(true)
            .interact_text()?;

        if is_exit(&question) {
            break;
        }

        let reply = respond(&pipeline, &question, &history).await;
        println!();
        println!("{}", reply);
        println!();

        history.push(ChatTurn::new(question, reply));
    }

    info!("Chat session ended after {} turns", history.len());
    Ok(())
}

/// Show configuration, index and model details
#[inline]
pub async fn show_status(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        Config {
            base_dir: config_dir.to_path_buf(),
            ..Config::default()
        }
    });

    println!("📊 PND Assistant Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   File: {}", config.config_file_path().display());
    match config.validate() {
        Ok(()) => println!("   ✅ Settings: Valid"),
        Err(e) => println!("   ❌ Settings: {}", e),
    }
    match config.require_credentials() {
        Ok(()) => println!("   ✅ Credentials: Available"),
        Err(e) => println!("   ❌ Credentials: {}", e),
    }

    println!();
    println!("🤖 Models:");
    println!(
        "   Embedding: {} ({}, {})",
        config.embedding.model,
        config.embedding.provider.as_str(),
        config.embedding.base_url()
    );
    println!(
        "   Generation: {} ({}, {}, temperature {})",
        config.generation.model,
        config.generation.provider.as_str(),
        config.generation.base_url(),
        config.generation.temperature
    );
    println!("   Passages per question: {}", config.retrieval.k);

    println!();
    println!("🔍 Plan Index:");
    let index_path = config.index_path();
    println!("   Location: {}", index_path.display());
    println!("   Table: {}", config.retrieval.table);
    match VectorStore::open(&index_path, &config.retrieval.table).await {
        Ok(store) => {
            println!("   ✅ LanceDB: Opened");
            match store.count_chunks().await {
                Ok(count) => println!("   📄 Chunks Indexed: {}", count),
                Err(e) => println!("   ⚠️  Chunks Indexed: Unknown - {}", e),
            }
            println!("   🔢 Vector Dimension: {}", store.vector_dimension());
        }
        Err(e) => {
            println!("   ❌ LanceDB: {}", e);
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'pnd-assistant config' to change the model services");
    println!("   • Use 'pnd-assistant ask \"<pregunta>\"' to ask a single question");
    println!("   • Use 'pnd-assistant chat' to start a conversation");

    Ok(())
}

fn is_exit(input: &str) -> bool {
    let input = input.trim();
    input.is_empty() || EXIT_WORDS.iter().any(|word| input.eq_ignore_ascii_case(word))
}
