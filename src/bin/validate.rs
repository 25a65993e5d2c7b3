use clap::Parser;
use std::path::PathBuf;
use stixrel::graph::dedup_records;
use stixrel::pipeline::prepare_document;
use stixrel::validate::{check_records, check_registry_path, Registry};
use stixrel::{Config, Extractor, ScanMode};
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "validate")]
#[command(about = "Check extracted relationships against an external registry file")]
struct Args {
    /// Registry text file
    registry: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    // Checked before anything is loaded or parsed
    if let Err(e) = check_registry_path(&args.registry) {
        eprintln!("Error: {}", e);
        eprintln!("Usage: validate <REGISTRY>");
        std::process::exit(2);
    }

    let config = Config::load()?;
    let registry = Registry::load(&args.registry)?;

    let document = prepare_document(&config, &config.extraction).await?;
    let extraction = Extractor::new(&config.extraction).extract(&document, ScanMode::Full);

    let records = dedup_records(extraction.records);
    let stats = check_records(&records, &registry, &config.validation.name_expansions)?;
    println!("{}", stats);

    Ok(())
}
