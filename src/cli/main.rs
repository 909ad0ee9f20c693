use alert_relay::config::RelayConfig;
use alert_relay::correlation::{AlertClassifier, CorrelationCache, KeyExtractor, ManualClock};
use alert_relay::models::InboundAlert;
use alert_relay::processing::{load_patterns, MessageFilter};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::error::Error;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "alert-relay-cli")]
#[command(about = "Alert relay operator CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the correlation key found in a message
    Extract {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Replay messages through a fresh classifier and print each decision
    Classify {
        /// One JSON message per line: {"text", "channel", "ts", "attachments", "received_at"}
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Severity tags marking volatile alerts
        #[arg(short, long, value_delimiter = ',', default_value = "Disaster,High")]
        tags: Vec<String>,

        /// Trigger count required before a tagged recovery is announced
        #[arg(short = 'n', long, default_value = "3")]
        flap_threshold: u32,
    },

    /// Test a message against a patterns file
    CheckPatterns {
        #[arg(short, long, default_value = "config/patterns.json")]
        patterns: PathBuf,

        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { text } => {
            let text = text.replace("\\n", "\n");
            match KeyExtractor::new().extract_with_shape(&text) {
                Some((key, shape)) => {
                    println!("{}", json!({ "key": key, "shape": format!("{:?}", shape) }));
                }
                None => {
                    println!("{}", json!({ "key": null }));
                }
            }
        }

        Commands::Classify {
            file,
            tags,
            flap_threshold,
        } => {
            let config = RelayConfig {
                trigger_tags: tags,
                recovery_flap_threshold: flap_threshold,
                ..RelayConfig::default()
            };
            let classifier = AlertClassifier::from_config(&config);
            let clock = Arc::new(ManualClock::default());
            let mut cache = CorrelationCache::new(clock.clone());

            let reader = BufReader::new(std::fs::File::open(&file)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }

                let alert: InboundAlert = serde_json::from_str(&line)
                    .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                clock.set(alert.received_at);

                let decision = classifier.classify(&alert, &mut cache);
                println!(
                    "{}",
                    json!({
                        "line": line_no + 1,
                        "decision": decision,
                        "open_incidents": cache.len(),
                    })
                );
            }
        }

        Commands::CheckPatterns { patterns, text } => {
            let loaded = load_patterns(&patterns)?;
            let filter = MessageFilter::new(&loaded, std::iter::empty::<String>(), "")?;
            let text = text.replace("\\n", "\n");
            println!(
                "{}",
                json!({ "patterns": loaded, "matches": filter.matches_text(&text) })
            );
        }

        Commands::Health => {
            let response = Client::new()
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
