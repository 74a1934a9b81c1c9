use crate::{ExplorerError, ExplorerResult, PUBLIC_PROJECT, SessionConfig};

use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

// https://stackoverflow.com/questions/74068168/clap-rs-not-printing-colors-during-help
fn get_styles() -> clap::builder::Styles {
    let cyan = anstyle::Color::Ansi(anstyle::AnsiColor::Cyan);
    let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
    let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);

    clap::builder::Styles::styled()
        .placeholder(anstyle::Style::new().fg_color(Some(yellow)))
        .usage(anstyle::Style::new().fg_color(Some(cyan)).bold())
        .header(
            anstyle::Style::new()
                .fg_color(Some(cyan))
                .bold()
                .underline(),
        )
        .literal(anstyle::Style::new().fg_color(Some(green)))
}

// https://docs.rs/clap/latest/clap/struct.Command.html#method.help_template
const APPLET_TEMPLATE: &str = "\
{before-help}
{about-with-newline}
{usage-heading} {usage}

{all-args}
{after-help}";

const EX1: &str = r#" bq-explorer"#;
const EX2: &str = r#" bq-explorer -k service-account.json"#;
const EX3: &str = r#" bq-explorer -k key.json -p my-analytics-project -m 500"#;

// https://cloud.google.com/resource-manager/docs/creating-managing-projects#before_you_begin
const PROJECT_ID_PATTERN: &str = r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$";

/// Command-line arguments for the BigQuery Explorer application.
#[derive(Parser, Debug, Clone)]
#[command(
    // Read from `Cargo.toml`.
    author, version, about,
    long_about = None,
    next_line_help = true,
    help_template = APPLET_TEMPLATE,
    styles=get_styles(),
    after_help = format!("EXAMPLES:\n{EX1}\n{EX2}\n{EX3}")
)]
pub struct Arguments {
    /// Service-account key file saved on startup.
    #[arg(
        short = 'k',
        long,
        value_name = "KEY_FILE",
        help = "Service-account key (JSON) to connect with on startup [Optional]",
        long_help = "Path to a BigQuery service-account key document.\n\
        If omitted, paste the key in the side panel or use File > Load key."
    )]
    pub key_file: Option<PathBuf>,

    /// Project whose datasets are listed. [Default: bigquery-public-data]
    #[arg(
        short = 'p',
        long,
        value_name = "PROJECT_ID",
        default_value = PUBLIC_PROJECT,
        help = "Project whose datasets are browsed",
        long_help = "Project id whose datasets and tables fill the pickers.\n\
        Queries are always billed to the project embedded in the key.",
        value_parser = validate_project_id
    )]
    pub public_project: String,

    /// Maximum number of rows fetched per query. [Default: 10000]
    #[arg(
        short = 'm',
        long,
        value_name = "ROWS",
        default_value_t = 10_000,
        help = "Maximum rows fetched per query result",
        long_help = "Rows beyond this cap are not downloaded; the result is truncated.",
        value_parser = clap::value_parser!(u64).range(1..=1_000_000)
    )]
    pub max_rows: u64,

    /// Server-side wait per query poll, in milliseconds. [Default: 10000]
    #[arg(
        short = 't',
        long,
        value_name = "MILLISECONDS",
        default_value_t = 10_000,
        help = "Server-side wait per query request (ms)",
        long_help = "How long BigQuery holds each request open waiting for the job.\n\
        Longer jobs are polled again until they complete.",
        value_parser = clap::value_parser!(u64).range(100..=600_000)
    )]
    pub query_timeout_ms: u64,
}

impl Arguments {
    /// Build `Arguments` struct.
    pub fn build() -> Arguments {
        Arguments::parse()
    }

    /// Settings carried into each session.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            public_project: self.public_project.clone(),
            max_rows: usize::try_from(self.max_rows).unwrap_or(usize::MAX),
            query_timeout_ms: self.query_timeout_ms,
        }
    }
}

/// clap validator for the '--public-project' argument.
fn validate_project_id(s: &str) -> ExplorerResult<String> {
    let invalid = |reason: String| ExplorerError::InvalidArgument {
        arg_name: "--public-project".to_string(),
        reason,
    };

    let pattern = Regex::new(PROJECT_ID_PATTERN).map_err(|e| invalid(e.to_string()))?;

    if pattern.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(invalid(format!(
            "'{s}' is not a project id (6-30 lowercase letters, digits or hyphens)"
        )))
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
