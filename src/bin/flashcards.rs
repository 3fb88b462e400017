//! CLI binary for edgequake-flashcards.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `FlashcardRequest` + `GenerationConfig`, writes the artifacts and prints
//! the cards.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_flashcards::{
    artifact_path, generate, generate_to_dir, ChunkError, DedupPolicy, FlashcardRequest,
    GenerationConfig, GenerationOutput, GenerationProgressCallback, ProgressCallback,
    ResponseFormat, SourceFile, DEFAULT_SUBJECT,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Spinner while the input is read, then one bar step per chunk.
struct CliProgressCallback {
    bar: ProgressBar,
    chunk_started: Mutex<Option<Instant>>,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
            fallbacks: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.chunk_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_chunks: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} chunks  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_chunks as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Generating");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating flashcards from {total_chunks} chunks…"))
        ));
    }

    fn on_chunk_start(&self, chunk: usize, _total: usize) {
        if let Ok(mut t) = self.chunk_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {chunk}"));
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize, card_count: usize) {
        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {:<10}  {}",
            green("✓"),
            chunk,
            total,
            dim(&format!("{card_count:>3} cards")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_fallback(&self, chunk: usize, total: usize, reason: &str) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        let msg: String = if reason.chars().count() > 80 {
            let head: String = reason.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            reason.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {}  {}",
            yellow("⚠"),
            chunk,
            total,
            yellow(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_chunks: usize, card_count: usize) {
        self.bar.finish_and_clear();
        let fallbacks = self.fallbacks.load(Ordering::SeqCst);
        if fallbacks == 0 {
            eprintln!(
                "{} {} flashcards from {} chunks",
                green("✔"),
                bold(&card_count.to_string()),
                total_chunks
            );
        } else {
            eprintln!(
                "{} {} flashcards from {} chunks  ({} used a placeholder)",
                yellow("⚠"),
                bold(&card_count.to_string()),
                total_chunks,
                yellow(&fallbacks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Flashcards from a text file
  flashcards notes.txt --subject Biology

  # From a PDF, line-mode prompting, three chunks
  flashcards lecture.pdf --subject Physics --format lines --max-chunks 3

  # Pasted text from stdin
  pbpaste | flashcards --subject History -

  # Inline text, JSON on stdout
  flashcards --text "Mitochondria produce ATP." --json

  # Print the path of a previously written artifact
  flashcards --fetch flashcards_Biology.csv

OUTPUT:
  Three files are written to --output-dir (default ./output) per subject:
    flashcards_<subject>.csv   question,answer,topic,difficulty (with header)
    flashcards_<subject>.json  pretty-printed array of card objects
    flashcards_<subject>.txt   question<TAB>answer, one per line
  Running again with the same subject overwrites them.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (or its directory) for .pdf input
  RUST_LOG                Override the log filter
"#;

/// Generate study flashcards from text and PDF files using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "flashcards",
    version,
    about = "Generate study flashcards from text and PDF files using LLMs",
    long_about = "Split study material into chunks, ask an LLM for question/answer flashcards, \
drop duplicate questions and save the result as CSV, JSON and tab-separated text. Supports \
OpenAI, Anthropic, Google Gemini, Ollama and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input `.txt` or `.pdf` file; `-` reads text from stdin.
    input: Option<PathBuf>,

    /// Study text given inline (ignored when a file is given).
    #[arg(long, env = "FLASHCARDS_TEXT")]
    text: Option<String>,

    /// Subject used for topics and output file names.
    #[arg(short, long, env = "FLASHCARDS_SUBJECT", default_value = DEFAULT_SUBJECT)]
    subject: String,

    /// Directory receiving the CSV/JSON/TXT artifacts.
    #[arg(short, long, env = "FLASHCARDS_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Skip writing artifacts; print cards only.
    #[arg(long, env = "FLASHCARDS_NO_SAVE")]
    no_save: bool,

    /// Prompt/response style: json or lines.
    #[arg(long, env = "FLASHCARDS_FORMAT", value_enum, default_value = "json")]
    format: FormatArg,

    /// Maximum characters per chunk.
    #[arg(long, env = "FLASHCARDS_CHUNK_SIZE", default_value_t = 1500)]
    chunk_size: usize,

    /// Number of leading chunks sent to the model.
    #[arg(long, env = "FLASHCARDS_MAX_CHUNKS", default_value_t = 2)]
    max_chunks: usize,

    /// Character cap applied to each chunk inside the prompt.
    #[arg(long, env = "FLASHCARDS_PROMPT_CHARS", default_value_t = 2000)]
    prompt_chars: usize,

    /// Cards requested per chunk (line mode).
    #[arg(long, env = "FLASHCARDS_CARDS_PER_CHUNK", default_value_t = 5)]
    cards_per_chunk: usize,

    /// Cards kept per chunk after parsing.
    #[arg(long, env = "FLASHCARDS_MAX_CARDS", default_value_t = 10)]
    max_cards: usize,

    /// Model calls per chunk when JSON output is unparseable.
    #[arg(long, env = "FLASHCARDS_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Beam width for backends that support beam search.
    #[arg(long, env = "FLASHCARDS_NUM_BEAMS", default_value_t = 4)]
    num_beams: u32,

    /// Approximate prompt budget in tokens.
    #[arg(long, env = "FLASHCARDS_MAX_INPUT_TOKENS", default_value_t = 1024)]
    max_input_tokens: usize,

    /// Max LLM output tokens per call.
    #[arg(long, env = "FLASHCARDS_MAX_OUTPUT_TOKENS", default_value_t = 1500)]
    max_output_tokens: usize,

    /// Use sampling instead of greedy/beam decoding.
    #[arg(long, env = "FLASHCARDS_SAMPLE")]
    sample: bool,

    /// Sampling temperature (0.0–2.0), used with --sample.
    #[arg(long, env = "FLASHCARDS_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Nucleus sampling cutoff (0.0–1.0), used with --sample.
    #[arg(long, env = "FLASHCARDS_TOP_P", default_value_t = 0.9)]
    top_p: f32,

    /// How duplicate questions are detected: exact or normalized.
    #[arg(long, env = "FLASHCARDS_DEDUP", value_enum, default_value = "exact")]
    dedup: DedupArg,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Path to libpdfium, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Output structured JSON (GenerationOutput) instead of a card listing.
    #[arg(long, env = "FLASHCARDS_JSON")]
    json: bool,

    /// Print the path of a generated artifact in --output-dir and exit.
    #[arg(long, value_name = "FILENAME")]
    fetch: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "FLASHCARDS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FLASHCARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FLASHCARDS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Json,
    Lines,
}

impl From<FormatArg> for ResponseFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Json => ResponseFormat::Json,
            FormatArg::Lines => ResponseFormat::Lines,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DedupArg {
    Exact,
    Normalized,
}

impl From<DedupArg> for DedupPolicy {
    fn from(v: DedupArg) -> Self {
        match v {
            DedupArg::Exact => DedupPolicy::Exact,
            DedupArg::Normalized => DedupPolicy::Normalized,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.fetch.is_none();
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

    // ── Download-by-name mode ────────────────────────────────────────────
    if let Some(ref name) = cli.fetch {
        let path = artifact_path(&cli.output_dir, name)
            .with_context(|| format!("Cannot fetch '{}'", name))?;
        println!("{}", path.display());
        return Ok(());
    }

    // ── Build request & config ───────────────────────────────────────────
    let request = build_request(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = if cli.no_save {
        generate(&request, &config)
            .await
            .context("Flashcard generation failed")?
    } else {
        let (output, saved) = generate_to_dir(&request, &config)
            .await
            .context("Flashcard generation failed")?;
        if !cli.quiet {
            for path in saved.paths() {
                eprintln!("   {} {}", dim("→"), bold(&path.display().to_string()));
            }
        }
        output
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_cards(&output).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        print_summary(&output, show_progress);
    }

    Ok(())
}

/// Map the positional input / `--text` onto a request.
fn build_request(cli: &Cli) -> Result<FlashcardRequest> {
    let file = match cli.input {
        Some(ref p) if p.as_os_str() == "-" => None,
        Some(ref p) => Some(SourceFile::Path(p.clone())),
        None => None,
    };

    let text = match (&cli.input, &cli.text) {
        (Some(p), _) if p.as_os_str() == "-" => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            Some(buf)
        }
        (_, t) => t.clone(),
    };

    Ok(FlashcardRequest {
        subject: cli.subject.clone(),
        text,
        file,
    })
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .chunk_size(cli.chunk_size)
        .max_chunks(cli.max_chunks)
        .prompt_chunk_chars(cli.prompt_chars)
        .format(cli.format.clone().into())
        .cards_per_chunk(cli.cards_per_chunk)
        .max_cards_per_chunk(cli.max_cards)
        .max_attempts(cli.max_attempts)
        .num_beams(cli.num_beams)
        .max_input_tokens(cli.max_input_tokens)
        .max_output_tokens(cli.max_output_tokens)
        .dedup(cli.dedup.clone().into())
        .output_dir(&cli.output_dir);

    if cli.sample {
        builder = builder.sampling(cli.temperature, cli.top_p);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_cards(output: &GenerationOutput) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, card) in output.cards.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {}  {}",
            i + 1,
            card.question,
            dim(&format!("[{} · {}]", card.topic, card.difficulty))
        )?;
        writeln!(out, "     {}", card.answer)?;
    }
    Ok(())
}

fn print_summary(output: &GenerationOutput, progress_shown: bool) {
    let stats = &output.stats;
    if !progress_shown {
        eprintln!(
            "Generated {} flashcards for '{}' from {}/{} chunks in {}ms",
            output.cards.len(),
            output.subject,
            stats.processed_chunks,
            stats.total_chunks,
            stats.total_duration_ms
        );
        for err in output.chunks.iter().filter_map(|c| c.error.as_ref()) {
            eprintln!("  {}", describe_fallback(err));
        }
    }
    if stats.discarded_chunks > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} trailing chunks not processed (raise --max-chunks to include them)",
                stats.discarded_chunks
            ))
        );
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  ·  {} duplicates removed",
        dim(&stats.total_input_tokens.to_string()),
        dim(&stats.total_output_tokens.to_string()),
        stats.duplicates_removed,
    );
}

fn describe_fallback(err: &ChunkError) -> String {
    format!("{} {}", yellow("placeholder card:"), err)
}
