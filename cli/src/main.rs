use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use reqwest::Url;
use tracing_subscriber::EnvFilter;

use pilot999_contact::{
    ApiBase, ContactForm, FormClient, HttpContactApi, SubmitControl, SubmitOutcome, Toast,
};

#[derive(Parser)]
#[command(name = "pilot999-contact")]
#[command(about = "Send a message through the pilot999 contact form", long_about = None)]
#[command(version)]
struct Cli {
    /// Site the form is served from; relative API bases resolve against it
    #[arg(long, env = "PILOT999_SITE", default_value = "http://localhost:8080")]
    site: String,

    /// Page carrying the `api-base` meta tag (file path or URL)
    #[arg(long)]
    page: Option<String>,

    /// API base to use instead of reading it from a page
    #[arg(long, conflicts_with = "page")]
    api_base: Option<String>,

    /// Your name
    #[arg(long)]
    name: String,

    /// Reply-to address
    #[arg(long)]
    email: String,

    /// Message text
    #[arg(long)]
    message: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pilot999_contact=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let site = Url::parse(&cli.site).with_context(|| format!("Invalid site URL `{}`", cli.site))?;
    let base = match (&cli.api_base, &cli.page) {
        (Some(raw), _) => ApiBase::new(Some(raw.as_str())),
        (None, Some(page)) => ApiBase::from_page(&load_page(page).await?),
        (None, None) => ApiBase::default(),
    };

    let api = HttpContactApi::new(&site, &base)?;
    tracing::debug!(endpoint = %api.endpoint(), "resolved contact endpoint");

    let client = FormClient::new(api, SubmitControl::default(), Toast::default());
    let mut form = ContactForm::new(cli.name, cli.email, cli.message);

    let outcome = client.submit(&mut form).await;
    let note = client.note();

    match outcome {
        SubmitOutcome::Sent => {
            println!("{} {}", "✓".green(), note.green());
            Ok(ExitCode::SUCCESS)
        }
        SubmitOutcome::Incomplete | SubmitOutcome::Rejected(_) => {
            println!("{} {}", "✗".red(), note.yellow());
            Ok(ExitCode::FAILURE)
        }
        SubmitOutcome::Busy | SubmitOutcome::NetworkError => {
            println!("{} {}", "✗".red(), note.red());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn load_page(page: &str) -> Result<String> {
    if page.starts_with("http://") || page.starts_with("https://") {
        let response = reqwest::get(page)
            .await
            .with_context(|| format!("Failed to fetch page {page}"))?;
        return response
            .text()
            .await
            .with_context(|| format!("Failed to read page {page}"));
    }

    std::fs::read_to_string(page).with_context(|| format!("Failed to read page {page}"))
}
