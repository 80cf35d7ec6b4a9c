//! Extract a page body using site rules.
//!
//! Usage: fullfeed --url <URL> [--rules <PATH>] [--indexed] [--match-only]
//!
//! Loads the rule table, finds the rule for the URL, fetches the page and
//! prints the extracted content as JSON on stdout. A URL without a rule is
//! reported on stderr and is not a failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rs_fullfeed::{Extractor, MatchMode, Options};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fullfeed")]
#[command(about = "Extract a page body with LDRFullFeed site rules")]
struct Cli {
    /// Page to extract.
    #[arg(long)]
    url: String,

    /// Rule table in wedata JSON format.
    #[arg(long, default_value = "./items.json")]
    rules: PathBuf,

    /// Match all patterns in one RegexSet pass.
    #[arg(long)]
    indexed: bool,

    /// Print the matching rule instead of fetching the page.
    #[arg(long)]
    match_only: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = Options {
        rules_path: cli.rules.clone(),
        match_mode: if cli.indexed {
            MatchMode::Indexed
        } else {
            MatchMode::Linear
        },
        ..Options::default()
    };
    let extractor = Extractor::from_options(&options)?;

    if cli.match_only {
        match extractor.matches(&cli.url) {
            Some(rule) => println!("{}", serde_json::to_string_pretty(rule.record())?),
            None => eprintln!("{} doesn't match any rule", cli.url),
        }
        return Ok(());
    }

    match extractor.extract_url(&cli.url)? {
        Some(content) => println!("{}", serde_json::to_string_pretty(&content)?),
        None => eprintln!("{} doesn't match any rule", cli.url),
    }
    Ok(())
}
