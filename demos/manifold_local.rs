//! Drive the Ollama manifold the way a pipeline host would
//!
//! # Prerequisites
//!
//! 1. Start Ollama and pull a model:
//!    ```bash
//!    ollama serve
//!    ollama pull llama3:8b
//!    ```
//!
//! 2. Point the valves somewhere else if needed (optional):
//!    ```bash
//!    export OLLAMA_BASE_URL=http://localhost:11434
//!    ```
//!
//! 3. Run this demo:
//!    ```bash
//!    cargo run --example manifold_local -- "Why is the sky blue?"
//!    ```

use futures::StreamExt;
use ollama_manifold::prelude::*;
use ollama_manifold::{init_tracing, TracingConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&TracingConfig::default());

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Say hello in one sentence.".to_string());

    let valves = Valves::load(None)?;
    let manifold = OllamaManifold::with_valves(valves);
    manifold.on_startup().await;

    println!("=== {} models at {} ===", manifold.id(), manifold.valves().ollama_base_url);
    let models = manifold.pipelines().await;
    for model in &models {
        println!("  {}{} ({})", manifold.name(), model.name, model.id);
    }

    let Some(model) = models.first().filter(|m| m.id != manifold.id()) else {
        eprintln!("No usable model; is Ollama running?");
        manifold.on_shutdown().await;
        return Ok(());
    };

    let history = [
        Message::system("Answer in at most three sentences."),
        Message::user(&prompt),
    ];
    let body = json!({
        "stream": true,
        "messages": history,
        "user": {"name": "demo", "id": "local"}
    });
    let body = body.as_object().cloned().unwrap_or_default();

    match manifold.pipe(&prompt, &model.id, &history, body).await {
        PipeOutput::Streaming(mut lines) => {
            while let Some(line) = lines.next().await {
                println!("{}", line?);
            }
        }
        PipeOutput::Complete(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        PipeOutput::Failed(message) => eprintln!("{}", message),
    }

    manifold.on_shutdown().await;
    Ok(())
}
