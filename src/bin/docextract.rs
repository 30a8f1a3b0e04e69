//! CLI binary for edgequake-docextract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one submission and writes the report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docextract::{
    write_report, DocumentKind, DocumentPipeline, DocumentSource, ExtractionConfig,
    ExtractionProgressCallback, ProgressCallback, Submission, REPORT_FILENAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the submission plus a log line per
/// finished document. Documents may finish out of order in concurrent mode.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<DocumentKind, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos}/{len} documents  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self, kind: DocumentKind) -> String {
        let secs = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&kind))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_submission_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, kind: DocumentKind) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(kind, Instant::now());
        }
        self.bar.set_message(kind.title());
    }

    fn on_document_complete(&self, kind: DocumentKind, field_count: usize) {
        self.bar.println(format!(
            "  {} {:<26}  {:<10}  {}",
            green("✓"),
            kind.title(),
            dim(&format!("{field_count:>3} fields")),
            self.elapsed(kind),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, kind: DocumentKind, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<26}  {}  {}",
            red("✗"),
            kind.title(),
            red(&msg),
            self.elapsed(kind),
        ));
        self.bar.inc(1);
    }

    fn on_submission_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_documents.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} document(s) extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents extracted  ({} failed)",
                if failed == total_documents { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # All three documents, report in the current directory
  docextract --identity id.jpg --lower-secondary 10th.jpg --upper-secondary 12th.jpg

  # Documents from URLs, report to a chosen path
  docextract --identity https://example.com/id.png -o out/report.pdf

  # Refuse incomplete submissions
  docextract --require-all --identity id.jpg --lower-secondary 10th.jpg

  # Print the extracted records as JSON as well
  docextract --json --identity id.jpg > result.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  DOCEXTRACT_*            Fallback for every flag (e.g. DOCEXTRACT_CACHE_TTL)
"#;

/// Extract identity and marksheet fields from document photos into a PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "docextract",
    version,
    about = "Extract identity and marksheet fields from document photos into a PDF report",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Identity document image: local path or HTTP/HTTPS URL.
    #[arg(long, env = "DOCEXTRACT_IDENTITY")]
    identity: Option<String>,

    /// Lower secondary (10th grade) marksheet image.
    #[arg(long, env = "DOCEXTRACT_LOWER_SECONDARY")]
    lower_secondary: Option<String>,

    /// Upper secondary (12th grade) marksheet image.
    #[arg(long, env = "DOCEXTRACT_UPPER_SECONDARY")]
    upper_secondary: Option<String>,

    /// Where to write the PDF report.
    #[arg(short, long, env = "DOCEXTRACT_OUTPUT", default_value = REPORT_FILENAME)]
    output: PathBuf,

    /// Print the full result (records, errors, stats) as JSON on stdout.
    #[arg(long, env = "DOCEXTRACT_JSON")]
    json: bool,

    /// LLM model ID (default: gpt-4o).
    #[arg(long, env = "DOCEXTRACT_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "DOCEXTRACT_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCEXTRACT_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens per document.
    #[arg(long, env = "DOCEXTRACT_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Per-document LLM call timeout in seconds.
    #[arg(long, env = "DOCEXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCEXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Cache lifetime of an extracted record in seconds (at most one year).
    #[arg(long, env = "DOCEXTRACT_CACHE_TTL", default_value_t = 3600)]
    cache_ttl: u64,

    /// Process documents one at a time instead of concurrently.
    #[arg(long, env = "DOCEXTRACT_SEQUENTIAL")]
    sequential: bool,

    /// Fail unless all three documents are given.
    #[arg(long, env = "DOCEXTRACT_REQUIRE_ALL")]
    require_all: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCEXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCEXTRACT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build submission ─────────────────────────────────────────────────
    let submission = build_submission(&cli);
    if submission.is_empty() {
        anyhow::bail!(
            "No documents given; pass --identity, --lower-secondary or --upper-secondary"
        );
    }
    if cli.require_all {
        submission.require_complete()?;
    }

    // ── Build config and pipeline ────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let pipeline = DocumentPipeline::new(config)
        .await
        .context("Failed to initialise the extraction pipeline")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = pipeline
        .process(&submission)
        .await
        .context("Extraction failed")?;

    write_report(&output.report.bytes, &cli.output)
        .await
        .context("Failed to write report")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        if !show_progress {
            for error in output.errors() {
                eprintln!("  {} {}", red("✗"), error);
            }
        }
        eprintln!(
            "{}  {}/{} documents  {} page(s)  {}ms  →  {}",
            if stats.failed_documents == 0 { green("✔") } else { cyan("⚠") },
            stats.extracted_documents,
            stats.extracted_documents + stats.failed_documents,
            output.report.page_count,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  /  {} from cache",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
            dim(&stats.cache_hits.to_string()),
        );
    }

    Ok(())
}

fn build_submission(cli: &Cli) -> Submission {
    [
        (DocumentKind::Identity, &cli.identity),
        (DocumentKind::LowerSecondaryRecord, &cli.lower_secondary),
        (DocumentKind::UpperSecondaryRecord, &cli.upper_secondary),
    ]
    .into_iter()
    .filter_map(|(kind, arg)| arg.as_deref().map(|s| (kind, DocumentSource::parse(s))))
    .fold(Submission::new(), |submission, (kind, source)| {
        submission.with(kind, source)
    })
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .cache_ttl_secs(cli.cache_ttl)
        .sequential(cli.sequential);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
