use anyhow::{Context, Result};
use stixrel::graph::write_graph;
use stixrel::pipeline::prepare_document;
use stixrel::{diff_records, AdjacencyGraph, Config, Extractor, ScanMode};

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout is reserved for reports
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("extract");

    match command {
        "compare" => {
            run_compare(args.get(2).cloned()).await?;
        }
        "extract" => {
            run_extract().await?;
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: stixrel [extract | compare [SELECTOR]]");
            std::process::exit(2);
        }
    }

    Ok(())
}

/// Extract the full document and write the adjacency JSON
async fn run_extract() -> Result<()> {
    log::info!("Starting stixrel v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Source: {} (cache {})", config.source.url, config.cache_path().display());
    log::info!("Output: {}", config.output_path().display());

    let document = prepare_document(&config, &config.extraction).await?;
    let extraction = Extractor::new(&config.extraction).extract(&document, ScanMode::Full);

    let graph = AdjacencyGraph::from_records(extraction.records);
    if graph.is_empty() {
        log::warn!("No relationships extracted; the document layout may have changed");
    }
    write_graph(config.output_path(), &graph, config.output.indent)
        .with_context(|| format!("Failed to write {}", config.output_path().display()))?;

    log::info!(
        "Done: {} source types, {} relationships, {} overrides applied",
        graph.sources().count(),
        graph.edge_count(),
        extraction.overrides_applied
    );
    if !extraction.unresolved.is_empty() {
        log::warn!("{} references need manual handling:", extraction.unresolved.len());
        for unresolved in &extraction.unresolved {
            log::warn!("  {} -> {}", unresolved.owner, unresolved.relationship);
        }
    }

    Ok(())
}

/// Compare a full extraction against one restricted to summary tables
async fn run_compare(selector: Option<String>) -> Result<()> {
    let config = Config::load()?;

    let mut rules = config.extraction.clone();
    if let Some(selector) = selector {
        rules.summary_table_selector = Some(selector);
    }
    if rules.summary_table_selector.is_none() {
        anyhow::bail!(
            "No summary table selector. Pass one (stixrel compare <SELECTOR>) \
             or set extraction.summary_table_selector"
        );
    }

    let document = prepare_document(&config, &rules).await?;
    let extractor = Extractor::new(&rules);
    let full = extractor.extract(&document, ScanMode::Full);
    let summary = extractor.extract(&document, ScanMode::Summary);

    let report = diff_records(&full.records, &summary.records);
    println!("A: full document ({} records)", full.records.len());
    println!("B: summary tables ({} records)", summary.records.len());
    print!("{}", report);

    Ok(())
}
