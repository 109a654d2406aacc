//! Favii CLI - Command-line interface for favicon and page metadata lookup

use clap::{Parser, Subcommand, ValueEnum};
use favii::{Favii, FaviiBuilder, PageMetaInfo, TransportOptions};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Output format for meta subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Favii - find a site's favicon from its page markup
#[derive(Parser, Debug)]
#[command(name = "favii")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom User-Agent
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Seconds to wait on the server before giving up
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the favicon URL of each page, one per line
    Favicon {
        /// URLs to look up
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Print the meta and link tags of a page
    Meta {
        /// URL to fetch
        url: String,

        /// Output format
        #[arg(long, short, default_value = "text")]
        output: OutputFormat,
    },
}

/// JSON shape of the meta subcommand
#[derive(Serialize)]
struct MetaOutput<'a> {
    favicon_url: String,
    #[serde(flatten)]
    page: &'a PageMetaInfo,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let favii = match client_builder(cli.user_agent, cli.timeout)
        .use_cache(true)
        .build()
    {
        Ok(favii) => favii,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Favicon { urls } => run_favicon(&favii, &urls).await,
        Commands::Meta { url, output } => run_meta(&favii, &url, output).await,
    }
}

fn client_builder(user_agent: Option<String>, timeout: Option<u64>) -> FaviiBuilder {
    let mut options = TransportOptions::default();
    if let Some(secs) = timeout {
        options.read_timeout = Duration::from_secs(secs);
    }
    options.user_agent = user_agent;
    Favii::builder().transport_options(options)
}

async fn run_favicon(favii: &Favii, urls: &[String]) {
    let mut failed = false;
    for url in urls {
        match favii.get_favicon_url(url).await {
            Ok(favicon) => print_line(&favicon),
            Err(e) => {
                eprintln!("Error: {}: {}", url, e);
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}

async fn run_meta(favii: &Favii, url: &str, output: OutputFormat) {
    let info = match favii.get_page_info(url).await {
        Ok(info) => info,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        OutputFormat::Text => print_line(&format_text(&info)),
        OutputFormat::Json => {
            let output = MetaOutput {
                favicon_url: info.favicon_url(),
                page: &info,
            };
            let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
                eprintln!("Error serializing page info: {}", e);
                std::process::exit(1);
            });
            print_line(&json);
        }
    }
}

/// Format page info as a plain listing
fn format_text(info: &PageMetaInfo) -> String {
    let mut output = String::new();

    output.push_str(&format!("url: {}\n", info.url()));
    output.push_str(&format!("favicon: {}\n", info.favicon_url()));

    if !info.metas().is_empty() {
        output.push_str("\nmeta:\n");
        for meta in info.metas() {
            output.push_str(&format!("  {} = {}\n", display_or_dash(&meta.name), meta.content));
        }
    }

    if !info.links().is_empty() {
        output.push_str("\nlink:\n");
        for link in info.links() {
            output.push_str(&format!("  {} -> {}\n", display_or_dash(&link.rel), link.href));
        }
    }

    output.trim_end().to_string()
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Print one line to stdout
///
/// A closed pipe (`favii meta ... | head`) ends the process quietly.
fn print_line(line: &str) {
    let Err(e) = writeln!(io::stdout().lock(), "{}", line) else {
        return;
    };
    let code = match e.kind() {
        io::ErrorKind::BrokenPipe => 0,
        _ => {
            eprintln!("Error writing output: {}", e);
            1
        }
    };
    std::process::exit(code);
}
