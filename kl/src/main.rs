//! Keyline - key-serialized requests and priority-ordered notifications
//!
//! CLI entry point for routing record files and sending requests.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::{Value, json};
use tracing::{info, warn};

use keyline::cli::{Cli, Command, OutputFormat};
use keyline::config::Config;
use keyline::diagnostics::{DiagnosticsBus, Fault, create_diagnostics_bus};
use keyline::dispatcher::{Admission, Dispatcher, Outcome, RequestDescriptor};
use keyline::response::Payload;
use keyline::router::{Handler, KeySelector, ListenerFile, OwnerHandle, Registration, Router};
use keyline::transport::{Method, create_transport};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyline")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("keyline.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "Keyline loaded config: identity-field={}, nested-field={}",
        config.dispatcher.identity_field, config.router.nested_field
    );

    match cli.command {
        Command::Route {
            listeners,
            records,
            format,
        } => cmd_route(&config, &listeners, &records, format),
        Command::Send {
            urls,
            key,
            data,
            method,
        } => cmd_send(&config, urls, key, data, method).await,
        Command::Config => cmd_config(&config),
    }
}

/// Register listeners from a YAML file and dispatch every record line
fn cmd_route(config: &Config, listeners: &Path, records: &Path, format: OutputFormat) -> Result<()> {
    let bus = create_diagnostics_bus();
    let mut faults = bus.subscribe();
    let router = Router::new(config.router.clone(), bus.clone());

    let definitions = ListenerFile::load(listeners).context(format!("Failed to load {}", listeners.display()))?;
    let mut owners: HashMap<String, OwnerHandle> = HashMap::new();
    for definition in &definitions.listeners {
        let owner = owners
            .entry(definition.owner.clone())
            .or_insert_with(|| OwnerHandle::new(&definition.owner))
            .clone();
        let handler = print_handler(owner.name().to_string(), format);
        router
            .register(definition.to_registration(&owner, handler))
            .context(format!("Failed to register listener for {}", definition.owner))?;
    }
    info!(listeners = router.listener_count(), "cmd_route: listeners registered");

    let file = fs::File::open(records).context(format!("Failed to open {}", records.display()))?;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read records file")?;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = router.dispatch_text(&line) {
            warn!(line = index + 1, error = %e, "cmd_route: skipping record");
            eprintln!("{} line {}: {}", "error:".red().bold(), index + 1, e);
        }
    }

    while let Ok(fault) = faults.try_recv() {
        print_fault(&fault);
    }

    let metrics = router.metrics();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&json!({ "metrics": metrics }))?),
        OutputFormat::Text => println!(
            "{} dispatches={} delivered={} faults={} malformed={}",
            "summary:".bold(),
            metrics.dispatches,
            metrics.delivered,
            metrics.faults,
            metrics.malformed
        ),
    }
    Ok(())
}

fn print_handler(owner: String, format: OutputFormat) -> Handler {
    Handler::new(move |delivery| {
        match format {
            OutputFormat::Json => {
                let line = json!({
                    "owner": owner,
                    "listener": delivery.listener_id.value(),
                    "tier": delivery.tier.to_string(),
                    "depth": delivery.depth,
                    "record": delivery.record,
                });
                println!("{}", serde_json::to_string(&line)?);
            }
            OutputFormat::Text => {
                let indent = "  ".repeat(delivery.depth);
                println!(
                    "{}{} {} tier={} {}",
                    indent,
                    owner.cyan(),
                    delivery.listener_id.to_string().dimmed(),
                    delivery.tier,
                    delivery.record
                );
            }
        }
        Ok(())
    })
}

fn print_fault(fault: &Fault) {
    eprintln!(
        "{} [{}] {}: {}",
        "fault:".yellow().bold(),
        fault.kind,
        fault.origin,
        fault.message
    );
}

/// Send one request per url through the dispatcher
async fn cmd_send(
    config: &Config,
    urls: Vec<String>,
    key: Option<String>,
    data: Option<String>,
    method: Option<Method>,
) -> Result<()> {
    let payload = match data {
        Some(text) => {
            let value: Value = serde_json::from_str(&text).context("Failed to parse --data as JSON")?;
            if !value.is_object() {
                return Err(eyre::eyre!("--data must be a JSON object"));
            }
            value
        }
        None => json!({}),
    };

    let bus: Arc<DiagnosticsBus> = create_diagnostics_bus();
    let mut faults = bus.subscribe();

    let router = Arc::new(Router::new(config.router.clone(), bus.clone()));
    let printer = OwnerHandle::new("kl");
    router
        .register(Registration::new(
            &printer,
            KeySelector::Wildcard,
            print_handler(printer.name().to_string(), OutputFormat::Text),
        ))
        .context("Failed to register printing listener")?;

    let transport = create_transport(&config.transport).context("Failed to create transport")?;
    let dispatcher = Arc::new(
        Dispatcher::new(config.dispatcher.clone(), transport)
            .with_diagnostics(bus.clone())
            .with_sink(router.clone()),
    );

    let mut tickets = Vec::new();
    for url in urls {
        let mut request = RequestDescriptor::new(url.clone()).data(payload.clone()).context(url.clone());
        if let Some(method) = method {
            request = request.method(method);
        }
        if let Some(key) = &key {
            request = request.key(key.clone());
        }
        let request = request.on_success(|response| {
            if let Payload::Content(content) = &response.payload
                && !content.trim().is_empty()
            {
                println!("{}", content);
            }
            Ok(())
        });

        let ticket = dispatcher.admit(request);
        match ticket.admission {
            Admission::Sent => println!("{} {}", "sent".green(), url),
            Admission::Aborted => println!("{} {}", "aborted".yellow(), url),
            Admission::Queued { position } => println!("{} {} (position {})", "queued".blue(), url, position),
        }
        tickets.push((url, ticket));
    }

    let mut failed = 0;
    for (url, ticket) in tickets {
        let completion = ticket.completed().await?;
        match completion.outcome {
            Outcome::Succeeded { status } => println!("{} {} ({})", "done".green(), url, status),
            Outcome::Failed { message } => {
                failed += 1;
                println!("{} {}: {}", "failed".red(), url, message);
            }
            Outcome::Aborted => println!("{} {}", "aborted".yellow(), url),
        }
    }

    while let Ok(fault) = faults.try_recv() {
        print_fault(&fault);
    }

    if failed > 0 {
        return Err(eyre::eyre!("{} request(s) failed", failed));
    }
    Ok(())
}

/// Print the effective configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize config")?);
    Ok(())
}
