//! Card Provider - look up cards and download their artwork
//!
//! Resolves the given card names against the local card tables and prints
//! what was found. Optionally saves front/back images to a directory.

use card_provider::{CancellationToken, CardProvider, ProviderConfig};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve MTG card names against local MTGJSON tables
#[derive(Parser, Debug)]
#[command(name = "card_provider")]
#[command(version, about, long_about = None)]
struct Args {
    /// Card names to look up
    #[arg(required = true)]
    names: Vec<String>,

    /// Path to the card table (cards.csv)
    #[arg(long)]
    cards: Option<PathBuf>,

    /// Path to the identifier table (cardIdentifiers.csv)
    #[arg(long)]
    identifiers: Option<PathBuf>,

    /// URL of the generic card back image
    #[arg(long)]
    card_back_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Save front/back images for each card into this directory
    #[arg(long)]
    images: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn build_config(args: &Args) -> ProviderConfig {
    let mut config = ProviderConfig::default().with_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(cards) = &args.cards {
        config.cards_path = cards.clone();
    }
    if let Some(identifiers) = &args.identifiers {
        config.identifiers_path = identifiers.clone();
    }
    if let Some(url) = &args.card_back_url {
        config = config.with_card_back_url(url.clone());
    }
    config
}

/// File-system friendly version of a card name
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

async fn save_images(
    provider: &CardProvider,
    name: &str,
    dir: &Path,
    cancel: &CancellationToken,
) -> std::io::Result<()> {
    let (front, back) = match provider.fetch_images(name, cancel).await {
        Ok(images) => images,
        Err(e) => {
            log::error!("Failed to fetch images for {}: {}", name, e);
            return Ok(());
        }
    };

    let stem = file_stem(name);
    for (face, image) in [("front", front), ("back", back)] {
        match image {
            Some(image) => {
                let path = dir.join(format!("{}_{}.jpg", stem, face));
                tokio::fs::write(&path, image.bytes()).await?;
                log::info!("Saved {}", path.display());
            }
            None => log::warn!("No {} image for {}", face, name),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args);

    log::info!("Card table: {}", config.cards_path.display());
    log::info!("Identifier table: {}", config.identifiers_path.display());

    let provider = match CardProvider::new(config) {
        Ok(provider) => provider,
        Err(e) => {
            log::error!("Application error: {e}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling...");
            ctrl_c.cancel();
        }
    });

    let records = match provider.resolve_many(&args.names, &cancel).await {
        Ok(records) => records,
        Err(e) => {
            log::error!("Application error: {e}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let summaries: Vec<_> = records
        .iter()
        .map(|record| record.summary(provider.hosts()))
        .collect();
    if args.json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to serialize records: {e}"),
        }
    } else {
        for summary in &summaries {
            println!(
                "{} [{}] {}",
                summary.name,
                summary.type_tags.join(", "),
                summary.tagger_url.as_deref().unwrap_or("-")
            );
        }
    }

    let found: std::collections::HashSet<String> =
        records.iter().map(|record| record.key()).collect();
    for name in &args.names {
        if !found.contains(&card_provider::normalize_name(name)) {
            println!("{name}: not found");
        }
    }

    if let Some(dir) = &args.images {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            eprintln!("Error: cannot create {}: {e}", dir.display());
            std::process::exit(1);
        }
        for record in &records {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(e) = save_images(&provider, &record.name, dir, &cancel).await {
                log::error!("Failed to save images for {}: {}", record.name, e);
            }
        }
    }
}
