//! PDF redaction CLI
//!
//! Masks emails, phone numbers, addresses and named entities in a PDF and
//! writes the result next to the input (or to `--output`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use redact_core::{
    EntityRecognizer, GazetteerRecognizer, RedactionConfig, RedactionOptions, Redactor,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdf-redact")]
#[command(version, about = "Remove sensitive text from PDF documents")]
struct Args {
    /// PDF to redact
    input: PathBuf,

    /// Output path [default: <input>_masked_<timestamp>.pdf]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Mask email addresses
    #[arg(long)]
    email: bool,

    /// Mask phone numbers
    #[arg(long)]
    phone: bool,

    /// Mask street addresses
    #[arg(long)]
    address: bool,

    /// Mask person names (needs --entities)
    #[arg(long)]
    person: bool,

    /// Mask countries, cities and states (needs --entities)
    #[arg(long)]
    gpe: bool,

    /// Mask other locations (needs --entities)
    #[arg(long)]
    loc: bool,

    /// Mask organizations (needs --entities)
    #[arg(long)]
    org: bool,

    /// Mask 11-digit Turkish identification numbers
    #[arg(long)]
    tc: bool,

    /// Enable every category
    #[arg(long)]
    all: bool,

    /// Replace matches with `*` placeholders
    #[arg(long)]
    style_star: bool,

    /// Replace matches with solid black boxes
    #[arg(long)]
    style_black: bool,

    /// Outline matches in red, leaving the text in place
    #[arg(long)]
    style_frame: bool,

    /// With --style-frame, also remove the framed text
    #[arg(long)]
    secure_frame: bool,

    /// Log and skip entity recognizer failures instead of aborting
    #[arg(long)]
    isolate_entity_failures: bool,

    /// Entity lexicon: JSON object mapping labels (PERSON, GPE, LOC, ORG) to terms
    #[arg(long, value_name = "FILE")]
    entities: Option<PathBuf>,

    /// JSON options file, merged with the flags
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Print a JSON report to stdout
    #[arg(long)]
    report: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn flag_options(&self) -> RedactionOptions {
        RedactionOptions {
            mask_email: self.email || self.all,
            mask_phone: self.phone || self.all,
            mask_address: self.address || self.all,
            mask_person: self.person || self.all,
            mask_gpe: self.gpe || self.all,
            mask_loc: self.loc || self.all,
            mask_org: self.org || self.all,
            mask_tc: self.tc || self.all,
            style_star: self.style_star,
            style_black: self.style_black,
            style_frame: self.style_frame,
            secure_frame: self.secure_frame,
            isolate_entity_failures: self.isolate_entity_failures,
        }
    }

    fn resolve_options(&self) -> anyhow::Result<RedactionOptions> {
        let flags = self.flag_options();
        match &self.options {
            Some(path) => {
                let from_file = RedactionOptions::from_json_file(path)
                    .with_context(|| format!("Failed to load options from {}", path.display()))?;
                Ok(from_file.merge(&flags))
            }
            None => Ok(flags),
        }
    }
}

/// `<dir>/<stem>_masked_<timestamp>.pdf`
fn default_output_path(input: &Path, timestamp: i64) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{}_masked_{}.pdf", stem, timestamp))
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // All diagnostics go to stderr, stdout is reserved for --report
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let options = args.resolve_options()?;
    let config = RedactionConfig::from(&options);
    if config.categories().is_empty() {
        bail!("No categories selected. Use --email, --phone, --address, --tc, --person, --gpe, --loc, --org or --all");
    }
    if config.style().is_none() {
        tracing::warn!("No style selected, matches are removed without a visible marker");
    }

    let recognizer: Option<Box<dyn EntityRecognizer>> = match &args.entities {
        Some(path) => {
            let gazetteer = GazetteerRecognizer::from_json_file(path)
                .with_context(|| format!("Failed to load entity lexicon {}", path.display()))?;
            tracing::info!(terms = gazetteer.term_count(), "Loaded entity lexicon");
            Some(Box::new(gazetteer))
        }
        None => None,
    };

    let redactor = Redactor::from_config(config, recognizer)
        .context("Entity categories need an entity lexicon (--entities)")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, chrono::Utc::now().timestamp()));

    tracing::info!(
        "Redacting {} -> {} ({} detectors)",
        args.input.display(),
        output.display(),
        redactor.detectors().len()
    );

    let report = redactor
        .redact_file(&args.input, &output)
        .with_context(|| format!("Failed to redact {}", args.input.display()))?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "Redacted {} region(s) across {} page(s) -> {}",
            report.total_regions,
            report.page_count,
            output.display()
        );
    }

    Ok(())
}
