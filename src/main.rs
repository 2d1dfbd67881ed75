use anyhow::{bail, Result};
use clap::Parser;
use hl7_profile::{
    aggregator::aggregate, cli::Cli, config::ProfileConfig, ingest, report, sequence,
};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber on stderr (`--debug` forces TRACE)
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let start = Instant::now();
    let config = ProfileConfig::resolve(&args)?;
    let vocabulary = config.load_vocabulary()?;

    let files = ingest::discover_files(&args.input, &config.extension)?;
    if files.is_empty() {
        bail!(
            "No .{} files found in {}",
            config.extension,
            args.input.display()
        );
    }

    let workers = config.worker_count(files.len());
    let decoded = ingest::decode_files(&files, workers)?;
    if decoded.messages.is_empty() {
        bail!(
            "No messages could be decoded ({} files failed)",
            decoded.errors.len()
        );
    }

    let aggregation = aggregate(&decoded.messages, &vocabulary, config.max_unique_values);

    info!("Profiling segment sequences...");
    let profiles = sequence::profile_by_category(&decoded.messages);
    for (category, profile) in &profiles {
        info!(
            category = %category,
            messages = profile.total_messages,
            patterns = profile.common_sequences.len(),
            "sequence profile"
        );
    }

    let report = report::build_report(
        &aggregation,
        profiles,
        &vocabulary,
        config.max_unique_values,
    );
    report::write_report(&args.output, &report, args.pretty_output())?;

    info!("{}", "=".repeat(50));
    info!("PROFILE SUMMARY");
    info!("{}", "=".repeat(50));
    info!("Files found:        {}", files.len());
    info!("Messages decoded:   {}", decoded.messages.len());
    info!("Decode errors:      {}", decoded.errors.len());
    info!("Message types:      {}", report.totals_by_type.len());
    info!("Segments profiled:  {}", report.segments.len());
    info!("Total time:         {:.2}s", start.elapsed().as_secs_f64());
    info!("Output:             {}", args.output.display());

    Ok(())
}
