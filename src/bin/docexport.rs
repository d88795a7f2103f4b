//! CLI binary for unstructured-export.
//!
//! A thin shim over the library crate: reads parse payloads (JSON), maps CLI
//! flags to `ExportConfig` and writes the exported files.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Read, Write};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use unstructured_export::{export_as, ExportConfig, ExportFormat, ExportPayload, Exported, ImageMode};

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
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown to stdout
  docexport --format markdown parsed.json

  # HTML with a custom title, written to a file
  docexport -f html --title "Q3 Report" parsed.json -o report.html

  # Excel workbook, one sheet per table/chart
  docexport -f excel parsed.json -o tables.xlsx

  # Straight from the parse endpoint
  curl -s -F file=@report.pdf http://localhost:8000/api/v1/documents/parse \
    | docexport -f markdown -

  # Batch: every payload in a directory, 8 at a time
  docexport -f html -j 8 payloads/*.json -o exported/

  # Link images instead of embedding them
  docexport -f html --image-mode link --image-base-url https://cdn.example/doc parsed.json

INPUT:
  A JSON object with md_lines, html_lines, structured_items and images
  (relative path -> base64), or the {success, data, error} envelope
  returned by POST /api/v1/documents/parse. Missing fields default to empty.
  Images that fail to decode are dropped with a warning.

FORMATS:
  Name       Extension  MIME type
  ────────   ─────────  ─────────────────────────────────────────────────────────────
  markdown   .md        text/markdown
  html       .html      text/html
  excel      .xlsx      application/vnd.openxmlformats-officedocument.spreadsheetml.sheet
"#;

/// Export parse results to Markdown, HTML or Excel.
#[derive(Parser, Debug)]
#[command(
    name = "docexport",
    version,
    about = "Export parse results to Markdown, HTML or Excel",
    long_about = "Export structured parse results (Markdown lines, HTML lines, tables/charts \
and images) to a Markdown document, a self-contained HTML page or an XLSX workbook.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Payload JSON files, or `-` for stdin.
    #[arg(required_unless_present = "list_formats")]
    inputs: Vec<String>,

    /// Export format: markdown, html, excel (case-insensitive).
    #[arg(short, long, env = "DOCEXPORT_FORMAT", required_unless_present = "list_formats")]
    format: Option<String>,

    /// Output file (single input) or directory (several inputs). Default: stdout.
    #[arg(short, long, env = "DOCEXPORT_OUTPUT")]
    output: Option<PathBuf>,

    /// `<title>` of generated HTML documents.
    #[arg(long, env = "DOCEXPORT_TITLE")]
    title: Option<String>,

    /// How HTML output references images.
    #[arg(long, env = "DOCEXPORT_IMAGE_MODE", value_enum, default_value = "embed")]
    image_mode: ImageModeArg,

    /// Base URL for `--image-mode link`.
    #[arg(long, env = "DOCEXPORT_IMAGE_BASE_URL")]
    image_base_url: Option<String>,

    /// MIME type assumed for images sent as plain base64.
    #[arg(long, env = "DOCEXPORT_DEFAULT_IMAGE_MIME")]
    default_image_mime: Option<String>,

    /// Omit the built-in stylesheet from HTML output.
    #[arg(long, env = "DOCEXPORT_NO_STYLES")]
    no_styles: bool,

    /// Number of exports run at once in batch mode.
    #[arg(short = 'j', long, env = "DOCEXPORT_CONCURRENCY", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..=256))]
    concurrency: u16,

    /// Print the supported formats and exit.
    #[arg(long)]
    list_formats: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCEXPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCEXPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCEXPORT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ImageModeArg {
    Embed,
    Link,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let batch = cli.inputs.len() > 1;
    let show_progress = batch && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_formats {
        for f in ExportFormat::ALL {
            println!("{:<10} .{:<6} {}", f.name(), f.extension(), f.mime_type());
        }
        return Ok(());
    }

    let format: ExportFormat = cli
        .format
        .as_deref()
        .unwrap_or_default()
        .parse()
        .context("Invalid --format")?;
    let config = Arc::new(build_config(&cli)?);

    if batch {
        return run_batch(&cli, format, config, show_progress).await;
    }

    // ── Single input ─────────────────────────────────────────────────────
    let input = &cli.inputs[0];
    let started = Instant::now();
    let (exported, dropped) = export_one(input, format, Arc::clone(&config)).await?;
    let size = exported.len();

    match cli.output {
        Some(ref output) => {
            let target = if output.is_dir() {
                output.join(exported.file_name(&stem_of(input)))
            } else {
                output.clone()
            };
            write_atomic(&target, exported.data).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}  {}  {}ms  →  {}",
                    if dropped == 0 { green("✔") } else { cyan("⚠") },
                    format,
                    dim(&format!("{} bytes", size)),
                    started.elapsed().as_millis(),
                    bold(&target.display().to_string()),
                );
                if dropped > 0 {
                    eprintln!("   {} image(s) could not be decoded and were dropped", dropped);
                }
            }
        }
        None => {
            let stdout = io::stdout();
            if !format.is_text() && stdout.is_terminal() {
                anyhow::bail!(
                    "Refusing to write binary .{} output to a terminal; use --output",
                    format.extension()
                );
            }
            let mut handle = stdout.lock();
            handle
                .write_all(&exported.data)
                .context("Failed to write to stdout")?;
            handle.flush().context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Map CLI args to `ExportConfig`.
fn build_config(cli: &Cli) -> Result<ExportConfig> {
    let image_mode = match cli.image_mode {
        ImageModeArg::Embed => ImageMode::Embed,
        ImageModeArg::Link => ImageMode::Link {
            base_url: cli
                .image_base_url
                .clone()
                .context("--image-mode link requires --image-base-url")?,
        },
    };

    let mut builder = ExportConfig::builder()
        .html_styles(!cli.no_styles)
        .image_mode(image_mode);
    if let Some(ref title) = cli.title {
        builder = builder.html_title(title.clone());
    }
    if let Some(ref mime) = cli.default_image_mime {
        builder = builder.default_image_mime(mime.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Export several inputs concurrently into the `--output` directory.
async fn run_batch(
    cli: &Cli,
    format: ExportFormat,
    config: Arc<ExportConfig>,
    show_progress: bool,
) -> Result<()> {
    let out_dir = cli
        .output
        .clone()
        .context("Several inputs need --output <DIR>")?;
    if cli.inputs.iter().any(|i| i == "-") {
        anyhow::bail!("stdin (`-`) can only be used with a single input");
    }
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    let total = cli.inputs.len();
    let bar = show_progress.then(|| {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Exporting");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let started = Instant::now();
    let stems = batch_stems(&cli.inputs);
    let outcomes: Vec<(String, Result<PathBuf>)> =
        stream::iter(cli.inputs.iter().cloned().zip(stems).map(|(input, stem)| {
            let config = Arc::clone(&config);
            let out_dir = out_dir.clone();
            let bar = bar.clone();
            async move {
                let outcome = async {
                    let (exported, _) = export_one(&input, format, config).await?;
                    let target = out_dir.join(exported.file_name(&stem));
                    write_atomic(&target, exported.data).await?;
                    Ok::<_, anyhow::Error>(target)
                }
                .await;

                if let Some(bar) = bar {
                    match &outcome {
                        Ok(target) => bar.println(format!(
                            "  {} {}  {}",
                            green("✓"),
                            input,
                            dim(&format!("→ {}", target.display()))
                        )),
                        Err(e) => bar.println(format!("  {} {}  {}", red("✗"), input, red(&format!("{e:#}")))),
                    }
                    bar.inc(1);
                }
                (input, outcome)
            }
        }))
        .buffer_unordered(cli.concurrency as usize)
        .collect()
        .await;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let failed: Vec<&(String, Result<PathBuf>)> =
        outcomes.iter().filter(|(_, r)| r.is_err()).collect();
    let succeeded = total - failed.len();

    if !cli.quiet {
        eprintln!(
            "{} {}/{} files exported as {}  {}ms",
            if failed.is_empty() { green("✔") } else if succeeded == 0 { red("✘") } else { cyan("⚠") },
            bold(&succeeded.to_string()),
            total,
            format,
            started.elapsed().as_millis(),
        );
    }
    if !failed.is_empty() {
        if !show_progress {
            for (input, result) in &failed {
                if let Err(e) = result {
                    eprintln!("  {} {}: {:#}", red("✗"), input, e);
                }
            }
        }
        anyhow::bail!("{} of {} exports failed", failed.len(), total);
    }
    Ok(())
}

/// Load, reconstruct and export one payload. Returns the export and the
/// number of images dropped during reconstruction.
async fn export_one(
    input: &str,
    format: ExportFormat,
    config: Arc<ExportConfig>,
) -> Result<(Exported, usize)> {
    let payload = load_payload(input).await?;
    tokio::task::spawn_blocking(move || {
        let (result, dropped) = payload.into_result_with_report(&config.default_image_mime);
        export_as(&result, format, &config).map(|exported| (exported, dropped.len()))
    })
    .await
    .context("Export task panicked")?
    .with_context(|| format!("Failed to export {input}"))
}

/// Read a payload file (or stdin for `-`). Accepts the bare payload or the
/// `{success, data, error}` envelope of the parse endpoint.
async fn load_payload(input: &str) -> Result<ExportPayload> {
    let text = if input == "-" {
        tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map(|_| buf)
        })
        .await
        .context("stdin reader panicked")?
        .context("Failed to read stdin")?
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {input}"))?
    };

    let mut value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{input} is not valid JSON"))?;
    if value.get("success").is_some() {
        if let Some(data) = value.get_mut("data").map(serde_json::Value::take) {
            value = data;
        }
    }
    serde_json::from_value(value).with_context(|| format!("{input} is not a parse payload"))
}

/// File stem used to name an export: `parsed/report.json` → `report`.
fn stem_of(input: &str) -> String {
    if input == "-" {
        return "export".to_string();
    }
    Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "export".to_string())
}

/// One output stem per batch input, in input order. Inputs sharing a file
/// stem (`a/report.json`, `b/report.json`) get ` (2)`, ` (3)`, … so no two
/// exports land on the same file. Compared case-insensitively for the
/// benefit of case-folding file systems.
fn batch_stems(inputs: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let base = stem_of(input);
            let mut stem = base.clone();
            let mut n = 2usize;
            while !taken.insert(stem.to_lowercase()) {
                stem = format!("{base} ({n})");
                n += 1;
            }
            stem
        })
        .collect()
}

/// Atomic write: write to a uniquely named temp file next to the target,
/// then rename it over the target.
async fn write_atomic(path: &Path, data: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create a temp file in {:?}", parent))?;
        tmp.write_all(&data)
            .with_context(|| format!("Failed to write {:?}", tmp.path()))?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move output into place at {:?}", path))?;
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("Writer task panicked")?
}
