use std::collections::HashSet;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fwgen::api::config::{ApiConfig, ConfigError};
use fwgen::api::{ApiClient, ApiError, ExistingResourceSource, Firewall, TemplateSource};
use fwgen::label::{self, LabelError};
use fwgen::{DialogCallbacks, DialogController, DialogError, DialogState, ErrorCode, ProvisionOptions, Provisioner};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error(transparent)]
    Dialog(#[from] DialogError),
}

#[derive(Parser, Debug)]
#[command(name = "fwgen", about = "Generate Cloud Firewalls from templates")]
struct Cli {
    /// Template slug to use instead of the first one returned.
    #[arg(long, global = true, env = "FWGEN_TEMPLATE_SLUG")]
    template: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a firewall from a template.
    Generate {
        /// Retry retryable failures this many times.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// List available template slugs.
    Templates,
    /// Show the label the next generated firewall would get.
    Label {
        #[arg(long)]
        base: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ApiConfig::from_env()?;
    if cli.template.is_some() {
        config.template_slug = cli.template;
    }
    let client = Arc::new(ApiClient::new(&config)?);

    match cli.command {
        Command::Generate { retries } => run_generate(client, &config, retries).await,
        Command::Templates => run_templates(client.as_ref()).await,
        Command::Label { base } => run_label(client.as_ref(), &config, &base).await,
    }
}

async fn run_generate(client: Arc<ApiClient>, config: &ApiConfig, retries: u32) -> Result<(), CliError> {
    let options =
        ProvisionOptions { template_slug: config.template_slug.clone(), max_label_length: config.max_label_length };
    let provisioner = Provisioner::from_client(client).with_options(options);
    let callbacks = DialogCallbacks::default()
        .on_resource_generated(|fw: &Firewall| info!(id = fw.id, label = %fw.label, "firewall generated"));
    let dialog = DialogController::new(provisioner, callbacks);

    let mut rx = dialog.subscribe();
    let renderer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            render(&state);
        }
    });

    let mut attempt = 0;
    let outcome = loop {
        match dialog.submit().await {
            Ok(fw) => break Ok(fw),
            Err(e) if e.retryable() && attempt < retries => {
                attempt += 1;
                warn!(error = %e, code = e.error_code(), attempt, "generate: retrying");
            }
            Err(e) => break Err(e),
        }
    };

    drop(dialog);
    finish_renderer(renderer).await;

    let fw = outcome?;
    println!("{}\t{}", fw.id, fw.label);
    Ok(())
}

/// Wait for the renderer to drain. A renderer panic is logged, not fatal:
/// the firewall outcome is already decided.
async fn finish_renderer(renderer: JoinHandle<()>) -> bool {
    match renderer.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "generate: renderer task failed");
            false
        }
    }
}

async fn run_templates(client: &ApiClient) -> Result<(), CliError> {
    for template in client.fetch_templates().await? {
        println!(
            "{}\tinbound={}\toutbound={}",
            template.slug,
            template.rules.inbound.len(),
            template.rules.outbound.len()
        );
    }
    Ok(())
}

async fn run_label(client: &ApiClient, config: &ApiConfig, base: &str) -> Result<(), CliError> {
    let taken: HashSet<String> = client
        .fetch_existing()
        .await?
        .into_iter()
        .map(|fw| fw.label)
        .collect();
    println!("{}", label::allocate(base, &taken, config.max_label_length)?);
    Ok(())
}

fn render(state: &DialogState) {
    match state {
        DialogState::Prompt => eprintln!("[prompt] generate a firewall from a template"),
        DialogState::Progress { percent } => eprintln!("[progress] {percent}%"),
        DialogState::Success { firewall } => eprintln!("[success] created firewall {}", firewall.label),
        DialogState::Error { message } => eprintln!("[error] {message}"),
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
