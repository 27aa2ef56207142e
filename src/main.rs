mod config;
mod conversation;
mod participant;

use anyhow::{Context, bail, ensure};
use itertools::Itertools;
use log::{info, warn};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use structopt::StructOpt;
use strum::{Display, EnumString};
use tokio::io::{AsyncBufReadExt, BufReader};

use config::{Config, ParticipantConfig};
use conversation::orchestrator::Debate;
use conversation::{History, Transcript, format_line};
use participant::Participant;

#[derive(Debug, Clone, Copy, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Deserialize, Debug)]
struct Environment {
    first_api_key: Option<String>,
    second_api_key: Option<String>,
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "llm-debate-arena",
    about = "Watch two chat models debate each other, seeded by your prompt"
)]
struct Args {
    /// Seed prompt for the first participant (read from stdin when omitted)
    prompt: Option<String>,

    /// Number of rounds after the first reply; 0 runs the opening reply only
    #[structopt(short, long, default_value = "2")]
    rounds: u32,

    /// Path to participant configuration TOML file
    #[structopt(short, long)]
    config: Option<PathBuf>,

    /// Sampling temperature for both participants (0.0 to 2.0)
    #[structopt(short, long)]
    temperature: Option<f32>,

    /// Maximum output tokens per reply for both participants
    #[structopt(short, long)]
    max_tokens: Option<u32>,

    /// Output format (text or json)
    #[structopt(short, long, default_value = "text")]
    format: OutputFormat,

    /// Run even when a participant has no API key; its turns report the missing key
    #[structopt(long)]
    allow_unconfigured: bool,

    /// Keep reading further prompts from stdin, one per line
    #[structopt(short, long)]
    interactive: bool,

    /// Also write the session's transcripts to this file when done
    #[structopt(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let environment = envy::prefixed("ARENA_")
        .from_env::<Environment>()
        .context("Failed to read ARENA_* environment variables")?;
    let args = Args::from_args();

    let mut config = Config::load(args.config.as_deref()).await?;
    for participant in [&mut config.first, &mut config.second] {
        if let Some(temperature) = args.temperature {
            participant.temperature = temperature;
        }
        if let Some(max_tokens) = args.max_tokens {
            participant.max_tokens = max_tokens;
        }
    }
    config.validate()?;

    let first = build_participant(
        &config.first,
        environment.first_api_key.as_deref(),
        "ARENA_FIRST_API_KEY",
        args.allow_unconfigured,
    )?;
    let second = build_participant(
        &config.second,
        environment.second_api_key.as_deref(),
        "ARENA_SECOND_API_KEY",
        args.allow_unconfigured,
    )?;

    let debate = Debate::new(&first, &second, config.max_history_messages);
    let mut first_history = History::new();
    let mut second_history = History::new();
    let mut transcripts = Vec::new();

    let opening = match args.prompt.clone() {
        Some(prompt) => Some(prompt),
        None if args.interactive => None,
        None => {
            let mut prompt = String::new();
            std::io::stdin()
                .read_to_string(&mut prompt)
                .context("Failed to read prompt from stdin")?;
            Some(prompt)
        }
    };

    if let Some(prompt) = opening {
        let seed = seed_prompt(&prompt)?;
        transcripts.push(
            run_once(&debate, seed, &args, &mut first_history, &mut second_history).await?,
        );
    }

    if args.interactive {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let seed = line.trim();
            if seed.is_empty() {
                continue;
            }
            transcripts.push(
                run_once(&debate, seed, &args, &mut first_history, &mut second_history).await?,
            );
        }
    }

    if let Some(output) = &args.output {
        let rendered = match args.format {
            OutputFormat::Text => transcripts.iter().map(Transcript::to_text).join("\n\n"),
            OutputFormat::Json => serde_json::to_string_pretty(&transcripts)?,
        };
        tokio::fs::write(output, rendered)
            .await
            .with_context(|| format!("Failed to write transcript to {}", output.display()))?;
        info!("Wrote {} transcript(s) to {}", transcripts.len(), output.display());
    }

    Ok(())
}

fn seed_prompt(prompt: &str) -> anyhow::Result<&str> {
    let seed = prompt.trim();
    ensure!(!seed.is_empty(), "Please provide a prompt to start the debate");
    Ok(seed)
}

fn build_participant(
    config: &ParticipantConfig,
    api_key: Option<&str>,
    variable: &str,
    allow_unconfigured: bool,
) -> anyhow::Result<Participant> {
    let api_key = api_key.map(str::trim).filter(|key| !key.is_empty());
    let participant = config.build(api_key);

    if !participant.is_configured() {
        if !allow_unconfigured {
            bail!(
                "No API key for {} ({} provider). Set {variable} or pass --allow-unconfigured",
                config.name,
                config.provider
            );
        }
        warn!("{} has no API key, its turns will report the missing key", config.name);
    }

    Ok(participant)
}

async fn run_once(
    debate: &Debate<'_>,
    seed: &str,
    args: &Args,
    first_history: &mut History,
    second_history: &mut History,
) -> anyhow::Result<Transcript> {
    let streaming = matches!(args.format, OutputFormat::Text);
    if streaming {
        println!("{}", format_line("User", seed));
    }

    let transcript = debate
        .run(seed, args.rounds, first_history, second_history, |utterance| {
            if streaming {
                println!("{}", format_line(&utterance.speaker, &utterance.words));
            }
        })
        .await;

    match args.format {
        OutputFormat::Text => println!(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&transcript)?),
    }

    info!(
        "Histories now hold {} and {} messages",
        first_history.len(),
        second_history.len()
    );

    Ok(transcript)
}
