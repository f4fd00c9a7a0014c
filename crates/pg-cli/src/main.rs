//! PopGuard CLI
//!
//! CLI tool for scoring popup scenarios, replaying event traces and
//! checking settings documents.

mod replay;

use std::fs;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pg_core::types::BLOCK_THRESHOLD;
use pg_core::{Configuration, Engine, ScoreContext};
use pg_settings::parse_settings;

#[derive(Parser)]
#[command(name = "pg-cli")]
#[command(about = "PopGuard popup scoring tools")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single popup attempt
    Score {
        /// Settings document (JSON); extension defaults if omitted
        #[arg(short, long)]
        settings: Option<String>,

        /// Opener URL
        #[arg(short, long, default_value = "https://example.com/")]
        url: String,

        /// Evaluation time in ms
        #[arg(long, default_value_t = 100_000)]
        now: i64,

        /// Milliseconds since the last user gesture (none if omitted)
        #[arg(long)]
        last_interaction: Option<i64>,

        /// Popup attempts from the opener within the burst window
        #[arg(short, long, default_value_t = 0)]
        attempts: u32,

        /// Attempt was triggered from a play-button-like element
        #[arg(long)]
        play_button: bool,

        /// Attempt was triggered from a hidden element
        #[arg(long)]
        hidden: bool,
    },

    /// Replay a JSON event trace through the popup gate
    Replay {
        /// Settings document (JSON); extension defaults if omitted
        #[arg(short, long)]
        settings: Option<String>,

        /// Event trace (JSON)
        #[arg(short, long)]
        trace: String,

        /// Print outcomes as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Validate a settings document
    CheckSettings {
        /// Settings document (JSON)
        #[arg(short, long)]
        settings: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Score {
            settings,
            url,
            now,
            last_interaction,
            attempts,
            play_button,
            hidden,
        } => cmd_score(
            settings.as_deref(),
            &url,
            now,
            last_interaction,
            attempts,
            ScoreContext {
                is_play_button: play_button,
                is_hidden: hidden,
            },
        ),
        Commands::Replay {
            settings,
            trace,
            json,
        } => load_config(settings.as_deref())
            .and_then(|config| replay::run_replay(config, &trace, json)),
        Commands::CheckSettings { settings } => cmd_check_settings(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn load_config(path: Option<&str>) -> Result<Configuration, String> {
    let path = match path {
        Some(path) => path,
        None => {
            log::debug!("no settings file, using extension defaults");
            return Ok(Configuration::default());
        }
    };
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let config =
        parse_settings(&content).map_err(|e| format!("Invalid settings '{}': {}", path, e))?;
    log::debug!(
        "loaded settings from '{}': blocking={} aggressiveness={} whitelist={}",
        path,
        config.blocking_enabled,
        config.aggressiveness,
        config.whitelist.len()
    );
    Ok(config)
}

fn cmd_score(
    settings: Option<&str>,
    url: &str,
    now: i64,
    last_interaction: Option<i64>,
    attempts: u32,
    ctx: ScoreContext,
) -> Result<(), String> {
    let config = load_config(settings)?;
    let score = score_scenario(config, url, now, last_interaction, attempts, &ctx);
    let blocked = score >= BLOCK_THRESHOLD;

    println!("Score:     {}", score);
    println!("Threshold: {}", BLOCK_THRESHOLD);
    println!("Decision:  {}", if blocked { "block" } else { "allow" });

    Ok(())
}

/// Score one attempt from a fresh engine seeded with the given history.
fn score_scenario(
    config: Configuration,
    url: &str,
    now: i64,
    last_interaction: Option<i64>,
    attempts: u32,
    ctx: &ScoreContext,
) -> f64 {
    const OPENER: i32 = 1;
    let mut engine = Engine::with_config(config);

    if let Some(ago) = last_interaction {
        engine.user_interaction(OPENER, now.saturating_sub(ago));
    }
    for _ in 0..attempts {
        engine.record_attempt(OPENER, now);
    }

    engine.score(OPENER, url, ctx, now)
}

fn cmd_check_settings(path: &str) -> Result<(), String> {
    let config = load_config(Some(path))?;

    println!("Settings '{}' are valid", path);
    println!("  Blocking:        {}", if config.blocking_enabled { "enabled" } else { "disabled" });
    println!("  Aggressiveness:  {} (x{})", config.aggressiveness, config.aggressiveness_multiplier());
    println!("  Play buttons:    {}", config.detect_play_buttons);
    println!("  Whitelist:       {} domain(s)", config.whitelist.len());
    for domain in &config.whitelist {
        println!("    {}", domain);
    }
    if !config.detect_multi_popups || !config.detect_no_interaction {
        println!("  Note: detectMultiPopups/detectNoInteraction are stored but do not affect scoring");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn config() -> Configuration {
        Configuration {
            whitelist: BTreeSet::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_scenarios() {
        let url = "https://spam.example/";
        let none = ScoreContext::default();
        let hidden = ScoreContext { is_hidden: true, ..Default::default() };

        assert_eq!(score_scenario(config(), url, 100_000, None, 0, &none), 30.0);
        assert_eq!(score_scenario(config(), url, 100_000, None, 2, &none), 70.0);
        assert_eq!(score_scenario(config(), url, 100_000, Some(500), 0, &hidden), 40.0);

        let mut high = config();
        high.aggressiveness = 3;
        assert_eq!(score_scenario(high, url, 100_000, Some(500), 0, &hidden), 60.0);
    }

    #[test]
    fn test_score_extreme_times_do_not_overflow() {
        let url = "https://spam.example/";
        let ctx = ScoreContext::default();

        // interaction clamps to i64::MIN, which is 10ms before now
        let s = score_scenario(config(), url, i64::MIN + 10, Some(i64::MAX), 0, &ctx);
        assert_eq!(s, 0.0);

        // interaction clamps to i64::MAX, the same instant as now
        let s = score_scenario(config(), url, i64::MAX, Some(i64::MIN), 1, &ctx);
        assert_eq!(s, 20.0);
    }
}
