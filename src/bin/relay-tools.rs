use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stream_relay::tools::manifest::extract_akamai_manifests;
use stream_relay::tools::payload::{decode_payload, embed_files, extract_from_page};
use stream_relay::tools::probe::{parse_slugs, AttemptResult, Prober, MASTER_PLAYLIST_PATHS};

#[derive(Parser)]
#[command(name = "relay-tools")]
#[command(about = "Operator utilities for preparing stream schedules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a schedule into the payload slot of a static page
    Embed {
        #[arg(short, long, default_value = "matches-config.json")]
        config: PathBuf,
        #[arg(short, long)]
        page: PathBuf,
    },
    /// Print the schedule currently embedded in a page
    Decode {
        #[arg(short, long)]
        page: PathBuf,
    },
    /// Extract Akamai manifest URLs from a captured playback API response
    ExtractManifests {
        /// Read from this file instead of stdin
        file: Option<PathBuf>,
        /// Print a JSON array instead of one URL per line
        #[arg(long)]
        json: bool,
    },
    /// Find a working aggregate playlist on a host
    Probe {
        #[arg(short, long)]
        base: String,
        #[arg(short, long, env = "CHANNEL_M3U8_TOKEN")]
        token: String,
        /// Comma-separated channel slugs to check
        #[arg(short, long, env = "CHANNEL_SLUGS", default_value = "")]
        slugs: String,
        #[arg(short, long, default_value = "all-channels.m3u8")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: a .env next to the working directory feeds placeholders and probe defaults.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Embed { config, page } => {
            let count = embed_files(&config, &page, &|name: &str| std::env::var(name).ok())?;
            println!("Done. Encoded {} schedule entries into {}", count, page.display());
        }
        Commands::Decode { page } => {
            let html = std::fs::read_to_string(&page)?;
            let entries = decode_payload(extract_from_page(&html)?)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::ExtractManifests { file, json } => {
            let input = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            if input.trim().is_empty() {
                return Err("No input.".into());
            }

            let found = extract_akamai_manifests(input.trim())?;
            if found.is_empty() {
                return Err("No Akamai manifest URLs found.".into());
            }

            let urls: Vec<&str> = found.iter().map(|c| c.url.as_str()).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&urls)?);
            } else {
                eprintln!("Found {} Akamai manifest URL(s):\n", urls.len());
                for url in urls {
                    println!("{url}");
                }
            }
        }
        Commands::Probe {
            base,
            token,
            slugs,
            out,
        } => {
            let prober = Prober::new(base, token)?;

            let report = prober.find_master_playlist(&MASTER_PLAYLIST_PATHS).await?;
            for attempt in &report.attempts {
                match &attempt.result {
                    AttemptResult::Playlist => println!("Trying {} ... OK", attempt.path),
                    AttemptResult::Rejected(status) => {
                        println!("Trying {} ... {} (not a playlist or empty)", attempt.path, status.as_u16())
                    }
                    AttemptResult::Error(e) => println!("Trying {} ... Error: {}", attempt.path, e),
                }
            }
            match report.found {
                Some(found) => {
                    std::fs::write(&out, &found.body)?;
                    println!("Saved {} to {}", found.path, out.display());
                    println!("Preview (first 500 chars):");
                    println!("{}", found.body.chars().take(500).collect::<String>());
                }
                None => println!("No master playlist found."),
            }

            let slugs = parse_slugs(&slugs);
            if slugs.is_empty() {
                println!("\nTip: pass --slugs (or set CHANNEL_SLUGS) to check per-channel URLs.");
                return Ok(());
            }

            println!("\nPer-channel m3u8 URLs:");
            for check in prober.check_channels(&slugs).await? {
                match check.result {
                    Ok(status) if status.is_success() => println!("  {} ... OK", check.slug),
                    Ok(status) => println!("  {} ... {}", check.slug, status.as_u16()),
                    Err(e) => println!("  {} ... Error: {}", check.slug, e),
                }
                println!("    {}", check.url);
            }
        }
    }

    Ok(())
}
