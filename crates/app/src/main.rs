use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use plagiarism_check_core::{
    load_upload, CheckError, ClientConfig, ExcerptPolicy, HtmlPresenter, HttpCheckClient, Presenter,
    SubmissionHandler, SubmissionInput, SubmissionOutcome, TerminalPresenter,
    DEFAULT_CHECK_ENDPOINT,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "plagiarism-check", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Check endpoint of the plagiarism service
    #[arg(long, env = "PLAGIARISM_CHECK_ENDPOINT", default_value = DEFAULT_CHECK_ENDPOINT)]
    endpoint: String,

    /// Request timeout in seconds; unset keeps the transport default.
    #[arg(long, env = "PLAGIARISM_CHECK_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Html,
}

#[derive(Subcommand)]
enum Command {
    /// Submit text and/or a document and print the matches.
    Check {
        /// Text to check.
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,
        /// Read the text to check from a file.
        #[arg(long)]
        text_file: Option<PathBuf>,
        /// Document to upload (pdf, docx or txt).
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Append "..." to excerpts only when they were actually cut.
        #[arg(long, default_value_t = false)]
        mark_only_truncated: bool,
        /// Save the generated report, if any, to this path.
        #[arg(long)]
        download_report: Option<PathBuf>,
    },
    /// Download a generated report.
    Download {
        /// Report URL, absolute or relative to the service host.
        #[arg(long)]
        url: String,
        /// Destination file.
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(&cli.endpoint)?;
    if let Some(seconds) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(seconds));
    }

    info!(
        version = app_version,
        endpoint = %config.endpoint,
        started_at = %Utc::now().to_rfc3339(),
        "plagiarism-check boot"
    );

    let client = HttpCheckClient::new(config)?;

    match cli.command {
        Command::Check {
            text,
            text_file,
            file,
            format,
            mark_only_truncated,
            download_report,
        } => {
            let input = read_input(text, text_file.as_deref(), file.as_deref()).await?;
            let policy = if mark_only_truncated {
                ExcerptPolicy::MarkWhenTruncated
            } else {
                ExcerptPolicy::AlwaysMark
            };
            let download_report = download_report.as_deref();

            eprintln!("Checking...");
            match format {
                OutputFormat::Text => {
                    let presenter =
                        TerminalPresenter::with_report_base(client.config().endpoint.clone());
                    let handler = SubmissionHandler::new(client, presenter).with_excerpt_policy(policy);
                    run_check(&handler, &input, TerminalPresenter::output, download_report).await?;
                }
                OutputFormat::Html => {
                    let handler =
                        SubmissionHandler::new(client, HtmlPresenter::new()).with_excerpt_policy(policy);
                    run_check(&handler, &input, HtmlPresenter::page, download_report).await?;
                }
            }
        }
        Command::Download { url, output } => {
            let bytes = client.download_report(&url, &output).await?;
            println!("{bytes} bytes saved to {}", output.display());
        }
    }

    Ok(())
}

async fn read_input(
    text: Option<String>,
    text_file: Option<&Path>,
    file: Option<&Path>,
) -> anyhow::Result<SubmissionInput> {
    let text = match text_file {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => text,
    };
    let file = match file {
        Some(path) => Some(load_upload(path).await?),
        None => None,
    };

    Ok(ensure_not_empty(SubmissionInput { text, file })?)
}

fn ensure_not_empty(input: SubmissionInput) -> Result<SubmissionInput, CheckError> {
    if input.is_empty() {
        return Err(CheckError::InvalidArgument(
            "nothing to check: pass --text, --text-file or --file".to_string(),
        ));
    }
    Ok(input)
}

async fn run_check<P>(
    handler: &SubmissionHandler<HttpCheckClient, P>,
    input: &SubmissionInput,
    render: fn(&P) -> String,
    download_report: Option<&Path>,
) -> anyhow::Result<()>
where
    P: Presenter + Send,
{
    let outcome = handler.submit(input).await;
    {
        let presenter = handler.presenter().lock().await;
        print!("{}", render(&*presenter));
    }

    match outcome {
        SubmissionOutcome::Rendered { matches, report } => {
            info!(matches, report = ?report, "check complete");
            if let Some(destination) = download_report {
                match report {
                    Some(url) => {
                        let bytes = handler.transport().download_report(&url, destination).await?;
                        println!("{bytes} bytes saved to {}", destination.display());
                    }
                    None => warn!("service returned no report to download"),
                }
            }
            Ok(())
        }
        SubmissionOutcome::ServiceError(_) => anyhow::bail!("service rejected the submission"),
        SubmissionOutcome::TransportError(_) => anyhow::bail!("check request failed"),
        SubmissionOutcome::Superseded { sequence } => {
            warn!(sequence, "submission superseded by a newer one");
            Ok(())
        }
    }
}
