//! CLI binary for pdf2invoice.
//!
//! A thin shim over the library crate that maps CLI flags to the pipeline
//! entry points and prints results. Mirrors the three views of the
//! pipeline: the invoice record (default), the fully merged document
//! (`--integrated`), and the reassembled line strings (`--lines`).

use anyhow::{bail, Context, Result};
use clap::Parser;
use pdf2invoice::pipeline::fields;
use pdf2invoice::{document_from_json, document_from_path, reassemble, Document};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract the invoice record from extractor JSON (stdout)
  pdf2invoice invoice.json

  # Pretty-print, write to a file
  pdf2invoice --pretty -o record.json invoice.json

  # Full merged document for visualisation (merge tags, column stamps, lines)
  pdf2invoice --integrated --pretty invoice.json

  # Just the reassembled text lines
  pdf2invoice --lines invoice.json

  # Read from stdin, e.g. straight off the extractor
  extract-pdf-text invoice.pdf | pdf2invoice -

  # Batch: one record per input; a bad file does not stop the rest
  pdf2invoice january/*.json

INPUT SHAPE:
  The pdf.js-extract JSON a PDF text extractor produces:
    {"pages": [{"pageInfo": {"num", "width", "height"},
                "content": [{"str", "x", "y", "width", "height",
                             "fontSize"?, "angle"?, "hasEOL"?}],
                "links": ["https://…"]}]}
"#;

#[derive(Parser, Debug)]
#[command(
    name = "pdf2invoice",
    version,
    about = "Reassemble fragmented PDF invoice text and extract structured fields",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Extractor JSON files to process ('-' reads stdin)
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<String>,

    /// Print the merged document instead of the invoice record
    #[arg(long, conflicts_with = "lines")]
    integrated: bool,

    /// Print the reassembled line strings, one per line
    #[arg(long)]
    lines: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write output to FILE instead of stdout (single input only)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// More log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if cli.output.is_some() && cli.inputs.len() > 1 {
        bail!("-o/--output only makes sense with a single input file");
    }

    let mut rendered = Vec::with_capacity(cli.inputs.len());
    let mut failures = 0usize;

    // Documents are independent: one malformed file is reported and the
    // batch moves on.
    for input in &cli.inputs {
        match process_input(input, &cli) {
            Ok(out) => rendered.push(out),
            Err(e) => {
                eprintln!("{} {}: {:#}", red("✗"), input, e);
                failures += 1;
            }
        }
    }

    let body = rendered.join("\n");
    match &cli.output {
        Some(path) if failures == 0 => {
            std::fs::write(path, body.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} wrote {}", green("✔"), dim(&path.display().to_string()));
        }
        Some(_) => {}
        None => {
            if !body.is_empty() {
                println!("{body}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures}/{} inputs failed", cli.inputs.len());
    }
    Ok(())
}

fn process_input(input: &str, cli: &Cli) -> Result<String> {
    let doc = load_document(input)?;
    let merged = reassemble(&doc);

    if cli.lines {
        return Ok(render_lines(&merged));
    }

    let value = if cli.integrated {
        serde_json::to_value(&merged)?
    } else {
        serde_json::to_value(fields::extract_fields(&merged))?
    };
    let json = if cli.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(json)
}

fn load_document(input: &str) -> Result<Document> {
    if input == "-" {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .context("failed to read stdin")?;
        return Ok(document_from_json(&json)?);
    }
    Ok(document_from_path(input)?)
}

/// The `direct_concat` line views, page by page in scan order.
fn render_lines(doc: &Document) -> String {
    doc.pages
        .iter()
        .flat_map(|p| &p.fragments)
        .filter_map(|f| f.direct_concat.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_directive = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
