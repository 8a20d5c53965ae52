use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum, ValueHint};
use clap_complete::Shell;
use gscholar::config::{find_config_file, load_config};
use gscholar::models::{CitationFormat, ResolutionRequest};
use gscholar::resolver::Resolver;
use gscholar::sources::ScholarClient;
use gscholar::ui;
use gscholar::utils::rename_file;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// gscholar - Query Google Scholar and print citations for papers or PDFs
#[derive(Parser, Debug)]
#[command(name = "gscholar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query Google Scholar and print citations for papers or PDFs", long_about = None)]
#[command(override_usage = "gscholar [OPTIONS] {pdf | \"search terms\"}")]
struct Cli {
    /// Show all results instead of only the best match
    #[arg(short, long)]
    all: bool,

    /// Show debugging output
    #[arg(short, long)]
    debug: bool,

    /// Rename the PDF after the best match
    #[arg(short, long)]
    rename: bool,

    /// Output format
    #[arg(short = 'f', long = "outputformat", value_enum, default_value_t = OutputFormat::Bibtex)]
    output: OutputFormat,

    /// Page number to start parsing the PDF file at
    #[arg(short = 's', long = "startpage")]
    start_page: Option<u32>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,

    /// A PDF file to look up, or search terms
    #[arg(
        value_name = "pdf | \"search terms\"",
        value_hint = ValueHint::FilePath,
        required_unless_present = "completions"
    )]
    keyword: Option<String>,
}

/// Citation output formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Bibtex,
    Endnote,
    Refman,
    Wenxianwang,
}

impl From<OutputFormat> for CitationFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Bibtex => CitationFormat::Bibtex,
            OutputFormat::Endnote => CitationFormat::Endnote,
            OutputFormat::Refman => CitationFormat::Refman,
            OutputFormat::Wenxianwang => CitationFormat::Wenxianwang,
        }
    }
}

/// An existing file is looked up as a PDF, anything else is a query
fn request_for(keyword: &str, start_page: Option<u32>) -> ResolutionRequest {
    if Path::new(keyword).exists() {
        tracing::debug!("File exists, looking up the PDF: {}", keyword);
        ResolutionRequest::pdf(keyword, start_page)
    } else {
        tracing::debug!("Looking up the query: {}", keyword);
        ResolutionRequest::query(keyword)
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "gscholar=debug" } else { "gscholar=warn" };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "gscholar", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(cli.debug);

    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    let keyword = cli.keyword.as_deref().context("No PDF or search terms given")?;
    let request = request_for(keyword, cli.start_page);
    let format = CitationFormat::from(cli.output);

    let client = ScholarClient::new(&config).context("Failed to create the Google Scholar client")?;
    let resolver = Resolver::new(Arc::new(client), &config);

    let resolution = match resolver.resolve_detailed(&request, format, cli.all).await {
        Ok(resolution) => resolution,
        Err(e) if e.is_challenge() => {
            ui::print_error(&e.to_string());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if matches!(request, ResolutionRequest::PdfLookup { .. }) {
        ui::print_info(&format!("Searched for \"{}\"", resolution.lookup.query));
    }
    if resolution.citations.is_empty() {
        ui::print_error("No results found, try again with a different query!");
        std::process::exit(1);
    }
    if resolution.unrendered > 0 {
        ui::print_warning(&format!(
            "{} result(s) have no {} export and were left out",
            resolution.unrendered, format
        ));
    }

    if cli.all {
        tracing::debug!("All results:");
        for citation in &resolution.citations {
            println!("{}", citation);
        }
    } else {
        tracing::debug!("First result:");
        println!("{}", resolution.citations[0]);
    }

    if cli.rename {
        if !matches!(request, ResolutionRequest::PdfLookup { .. }) {
            ui::print_error(
                "You asked me to rename the pdf but didn't tell me which file to rename, aborting.",
            );
            std::process::exit(1);
        }
        let record = resolution
            .lookup
            .records
            .first()
            .context("No record to name the file after")?;
        let renamed = rename_file(Path::new(keyword), record)
            .with_context(|| format!("Failed to rename {}", keyword))?;
        ui::print_success(&format!("Renamed to {}", renamed.display()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["gscholar", "attention is all you need"]);
        assert!(!cli.all);
        assert!(!cli.debug);
        assert!(!cli.rename);
        assert_eq!(cli.output, OutputFormat::Bibtex);
        assert_eq!(cli.start_page, None);
        assert_eq!(cli.keyword.as_deref(), Some("attention is all you need"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["gscholar", "-a", "-d", "-r", "-s", "3", "paper.pdf"]);
        assert!(cli.all);
        assert!(cli.debug);
        assert!(cli.rename);
        assert_eq!(cli.start_page, Some(3));
    }

    #[test]
    fn test_cli_output_format() {
        let cli = Cli::parse_from(["gscholar", "-f", "endnote", "q"]);
        assert_eq!(CitationFormat::from(cli.output), CitationFormat::Endnote);

        let cli = Cli::parse_from(["gscholar", "--outputformat", "wenxianwang", "q"]);
        assert_eq!(CitationFormat::from(cli.output), CitationFormat::Wenxianwang);

        assert!(Cli::try_parse_from(["gscholar", "-f", "json", "q"]).is_err());
    }

    #[test]
    fn test_cli_requires_keyword() {
        assert!(Cli::try_parse_from(["gscholar"]).is_err());

        let cli = Cli::parse_from(["gscholar", "--completions", "bash"]);
        assert_eq!(cli.completions, Some(Shell::Bash));
        assert!(cli.keyword.is_none());
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from(["gscholar", "--config", "/path/to/config.toml", "q"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_existing_file_is_a_pdf_lookup() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let keyword = file.path().to_str().unwrap();

        assert_eq!(
            request_for(keyword, Some(2)),
            ResolutionRequest::pdf(file.path(), Some(2))
        );
        assert_eq!(
            request_for("deep residual learning", Some(2)),
            ResolutionRequest::query("deep residual learning")
        );
    }
}
