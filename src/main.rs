// llm-rewrite command-line entry point

use anyhow::{bail, Context};
use clap::Parser;
use llm_rewrite::{
    generate_many, generate_many_streaming, rank, Generation, GenerationRequest, LlmConfig,
    OllamaBackend, OllamaConfig, Operation, Ranking, RankingRequest,
};
use serde_json::json;
use std::io::{IsTerminal, Read, Write};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rewrite text with a local LLM.
///
/// Generates one or more variations of the input for the chosen operation and
/// can ask the model to rank them from best to worst.
#[derive(Parser, Debug)]
#[command(name = "llm-rewrite")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Text to transform (read from stdin when omitted)
    text: Option<String>,

    /// Operation: rephrase, grammar, simplify, expand, formal, casual,
    /// bullet_points, paragraph, clean, translate, summarize
    #[arg(short, long, default_value = "rephrase")]
    operation: String,

    /// Target language for `translate`
    #[arg(short, long)]
    language: Option<String>,

    /// Custom prompt template ({TEXT} and {LANGUAGE} are substituted)
    #[arg(short, long, value_name = "TEMPLATE")]
    prompt: Option<String>,

    /// Number of variations to generate
    #[arg(short = 'n', long, default_value = "1")]
    variations: usize,

    /// Rank the successful variations from best to worst
    #[arg(long)]
    rank: bool,

    /// Print text live as it streams in
    #[arg(long)]
    stream: bool,

    /// Base seed for the variations
    #[arg(long)]
    seed: Option<u64>,

    /// Ollama endpoint (default: $OLLAMA_HOST or http://localhost:11434)
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name (default: $OLLAMA_MODEL or llama3.2)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout: u64,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},llm_rewrite={}", level, level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .ok();
}

fn read_input(text: Option<String>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("no text given: pass it as an argument or pipe it on stdin");
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .context("Failed to read text from stdin")?;
    Ok(buffer)
}

fn backend_config(cli: &Cli) -> OllamaConfig {
    let mut config = OllamaConfig::from_env().timeout(Duration::from_secs(cli.timeout));
    if let Some(endpoint) = &cli.endpoint {
        config = config.endpoint(endpoint.clone());
    }
    if let Some(model) = &cli.model {
        config = config.model(model.clone());
    }
    let mut llm = LlmConfig::default().with_seed_temperature_step(0.05);
    if let Some(temperature) = cli.temperature {
        llm = llm.with_temperature(temperature);
    }
    config.llm(llm)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.variations == 0 {
        bail!("--variations must be at least 1");
    }

    let operation: Operation = cli.operation.parse()?;
    let text = read_input(cli.text.clone())?;

    let mut request = GenerationRequest::new(text, operation);
    if let Some(template) = &cli.prompt {
        request = request.with_custom_prompt(template.clone());
    }
    if let Some(language) = &cli.language {
        request = request.with_target_language(language.clone());
    }
    if let Some(seed) = cli.seed {
        request = request.with_seed(seed);
    }

    let backend = OllamaBackend::new(backend_config(&cli))?;
    tracing::info!(
        model = %backend.config().model,
        endpoint = %backend.config().endpoint,
        operation = %operation,
        variations = cli.variations,
        "starting generation"
    );

    let results = if cli.stream && !cli.json {
        let mut printed = 0usize;
        let mut current = usize::MAX;
        let mut stdout = std::io::stdout();
        let results = generate_many_streaming(&backend, &request, cli.variations, |index, text| {
            if index != current {
                current = index;
                printed = 0;
                let _ = write!(stdout, "\n--- Variation {} ---\n", index + 1);
            }
            if let Some(delta) = text.get(printed..) {
                let _ = write!(stdout, "{}", delta);
                let _ = stdout.flush();
            }
            printed = text.len();
        })
        .await;
        println!();
        results
    } else {
        generate_many(&backend, &request, cli.variations).await
    };

    let successes: Vec<(usize, &Generation)> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().ok().map(|g| (i, g)))
        .collect();

    let ranking = if cli.rank && successes.len() >= 2 {
        let task = operation.task_description(request.language());
        let ranking_request =
            RankingRequest::from_generations(task, successes.iter().map(|(_, g)| *g));
        Some(rank(&backend, &ranking_request).await)
    } else {
        None
    };

    if cli.json {
        print_json(&results, &successes, ranking.as_ref())?;
    } else {
        print_text(&results, &successes, ranking.as_ref(), cli.stream);
    }

    if successes.is_empty() {
        bail!("all {} variation(s) failed", results.len());
    }
    Ok(())
}

fn print_text(
    results: &[llm_rewrite::Result<Generation>],
    successes: &[(usize, &Generation)],
    ranking: Option<&llm_rewrite::Result<Ranking>>,
    streamed: bool,
) {
    if !streamed || results.iter().any(|r| r.is_err()) {
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(generation) if !streamed => {
                    if results.len() > 1 {
                        println!("--- Variation {} ---", i + 1);
                    }
                    println!("{}", generation.text);
                }
                Ok(_) => {}
                Err(e) => eprintln!("Variation {} failed: {}", i + 1, e),
            }
        }
    }

    match ranking {
        Some(Ok(ranking)) => {
            println!("\n=== Ranking ===");
            for (position, (variation, generation)) in ranking.ranked(successes) {
                println!("#{} (variation {}): {}", position, variation + 1, generation.text);
            }
        }
        Some(Err(e)) => eprintln!("Ranking failed: {}", e),
        None => {}
    }
}

fn print_json(
    results: &[llm_rewrite::Result<Generation>],
    successes: &[(usize, &Generation)],
    ranking: Option<&llm_rewrite::Result<Ranking>>,
) -> anyhow::Result<()> {
    let variations: Vec<_> = results
        .iter()
        .map(|r| match r {
            Ok(generation) => json!({ "ok": true, "generation": generation }),
            Err(e) => json!({ "ok": false, "reason": e.to_string() }),
        })
        .collect();

    let ranking = ranking.map(|r| match r {
        Ok(ranking) => {
            let variation_order: Vec<usize> =
                ranking.reorder(successes).into_iter().map(|(i, _)| i).collect();
            json!({ "ok": true, "order": variation_order, "raw_reply": ranking.raw_reply })
        }
        Err(e) => json!({ "ok": false, "reason": e.to_string() }),
    });

    let output = json!({ "variations": variations, "ranking": ranking });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
