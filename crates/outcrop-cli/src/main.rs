use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use outcrop_core::config_file::{self, ConfigFile};
use outcrop_parsing::{ParsingConfig, ParsingConfigBuilder, PdfBackend};
use outcrop_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// Outcrop - Cut geoscience PDFs down to the text around their study locations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepare token-bounded text parts for location extraction
    Prepare {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Maximum tokens per part [env: MAX_TOKENS_PER_PART]
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Fraction of the token budget shared by consecutive parts [env: OVERLAP_PERCENTAGE]
        #[arg(long)]
        overlap: Option<f64>,

        /// Prefix every part with the abstract [env: APPEND_ABSTRACT_TO_CONTEXT]
        #[arg(long)]
        append_abstract: Option<bool>,

        /// Path to output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the abstract found on the first page
    Abstract {
        /// Path to the PDF file
        file_path: PathBuf,
    },

    /// Print the first DOI found on the first page
    Doi {
        /// Path to the PDF file
        file_path: PathBuf,
    },

    /// Count how often each location name occurs in the document
    Frequencies {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Location names to count
        #[arg(required = true)]
        names: Vec<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

/// Command-line overrides for the parsing configuration.
#[derive(Debug, Default)]
struct ConfigFlags {
    max_tokens: Option<usize>,
    overlap: Option<f64>,
    append_abstract: Option<bool>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Prepare {
            file_path,
            max_tokens,
            overlap,
            append_abstract,
            output,
            no_color,
        } => {
            let flags = ConfigFlags {
                max_tokens,
                overlap,
                append_abstract,
            };
            prepare(&file_path, flags, output, no_color)
        }
        Command::Abstract { file_path } => print_abstract(&file_path),
        Command::Doi { file_path } => print_doi(&file_path),
        Command::Frequencies {
            file_path,
            names,
            no_color,
        } => frequencies(&file_path, &names, no_color),
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn prepare(
    file_path: &Path,
    flags: ConfigFlags,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    ensure_exists(file_path)?;
    let config = resolve_config(flags, config_file::load_config())?;
    tracing::debug!(
        max_tokens = config.max_tokens_per_part(),
        overlap = config.overlap_fraction(),
        append_abstract = config.append_abstract(),
        "Resolved configuration"
    );

    write_prepared(file_path, &MupdfBackend, &config, output.as_deref(), no_color)
}

/// Prepare `file_path` and print the parts to `output` or stdout.
///
/// The output file is only created once preparation has succeeded.
fn write_prepared(
    file_path: &Path,
    backend: &dyn PdfBackend,
    config: &ParsingConfig,
    output: Option<&Path>,
    no_color: bool,
) -> anyhow::Result<()> {
    let prepared = outcrop_parsing::prepare_text_for_extraction(file_path, backend, config)
        .with_context(|| format!("Failed to prepare {}", file_path.display()))?;

    let use_color = !no_color && output.is_none();
    let mut writer: Box<dyn Write> = if let Some(output_path) = output {
        let file = std::fs::File::create(output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        Box::new(file)
    } else {
        Box::new(std::io::stdout())
    };

    output::print_prepared(
        &mut writer,
        &display_name(file_path),
        &prepared,
        ColorMode(use_color),
    )?;
    Ok(())
}

fn print_abstract(file_path: &Path) -> anyhow::Result<()> {
    ensure_exists(file_path)?;
    let config = resolve_config(ConfigFlags::default(), config_file::load_config())?;
    let extracted = outcrop_parsing::extract_text(file_path, &MupdfBackend, &config)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    output::print_value(&mut std::io::stdout(), Some(&extracted.abstract_text))?;
    Ok(())
}

fn print_doi(file_path: &Path) -> anyhow::Result<()> {
    ensure_exists(file_path)?;
    let doi = outcrop_parsing::extract_first_page_doi(file_path, &MupdfBackend)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    output::print_value(&mut std::io::stdout(), doi.as_deref())?;
    Ok(())
}

fn frequencies(file_path: &Path, names: &[String], no_color: bool) -> anyhow::Result<()> {
    ensure_exists(file_path)?;
    let counts = outcrop_parsing::location_frequencies(file_path, &MupdfBackend, names)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    output::print_frequencies(&mut std::io::stdout(), &counts, ColorMode(!no_color))?;
    Ok(())
}

fn ensure_exists(file_path: &Path) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    Ok(())
}

fn display_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.display().to_string())
}

/// Resolve configuration: CLI flags > env vars > config file > defaults
fn resolve_config(flags: ConfigFlags, file: ConfigFile) -> anyhow::Result<ParsingConfig> {
    let chunking = file.chunking.unwrap_or_default();
    let context = file.context.unwrap_or_default();
    let layout = file.layout.unwrap_or_default();

    let max_tokens = match flags.max_tokens {
        Some(n) => Some(n),
        None => env_value::<usize>("MAX_TOKENS_PER_PART")?.or(chunking.max_tokens_per_part),
    };
    let overlap = match flags.overlap {
        Some(f) => Some(f),
        None => env_value::<f64>("OVERLAP_PERCENTAGE")?.or(chunking.overlap_percentage),
    };
    let append_abstract = match flags.append_abstract {
        Some(b) => Some(b),
        None => env_flag("APPEND_ABSTRACT_TO_CONTEXT")?.or(context.append_abstract),
    };

    let mut builder = ParsingConfigBuilder::new();
    if let Some(n) = max_tokens {
        builder = builder.max_tokens_per_part(n);
    }
    if let Some(f) = overlap {
        builder = builder.overlap_fraction(f);
    }
    if let Some(b) = append_abstract {
        builder = builder.append_abstract(b);
    }
    if let Some(m) = layout.header_margin {
        builder = builder.header_margin(m);
    }
    if let Some(m) = layout.footer_margin {
        builder = builder.footer_margin(m);
    }

    Ok(builder.build()?)
}

/// Parse an environment variable; unset or empty means "not configured".
fn env_value<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {name}: {v:?}")),
        _ => Ok(None),
    }
}

/// Boolean environment variable, accepting `True`/`False` in any case and `1`/`0`.
fn env_flag(name: &str) -> anyhow::Result<Option<bool>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => anyhow::bail!("Invalid value for {name}: {v:?}"),
        },
        _ => Ok(None),
    }
}
