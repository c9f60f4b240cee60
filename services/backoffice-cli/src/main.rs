//! Back-office command-line client
//!
//! Single binary that:
//! 1. Loads the backend and session configuration
//! 2. Opens the two-scope credential store
//! 3. Sends every backend call through the session pipeline (bearer
//!    attachment, single-flight refresh, expiry alerts)
//! 4. Prints response bodies to stdout and alerts to stderr

mod command;
mod config;
mod metrics;

use anyhow::{Context, Result};
use backoffice_auth::SessionStore;
use backoffice_session::{Alert, Navigator, SessionClient};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{Bytes, HeaderValue, RequestDescriptor, ReqwestTransport, Response};

use crate::command::{Cli, Command, content_type_for, json_body};
use crate::config::{Config, password_from_env};

/// Points the user at the login command once the session is gone.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate_to_sign_in(&self) {
        eprintln!("Sign in again with `backoffice login <username>`.");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // JSON logs on stderr so stdout carries only response bodies
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Install before any request so every counter is captured
    let prometheus = if cli.metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let transport = ReqwestTransport::new(http, config.backend.base_url.clone(), config.timeout());

    info!(
        base_url = transport.base_url(),
        timeout_secs = config.backend.timeout_secs,
        storage_path = %config.session.storage_path.display(),
        "configuration loaded"
    );

    let store = SessionStore::load(config.session.storage_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open session store at {}",
                config.session.storage_path.display()
            )
        })?;

    let client = SessionClient::new(
        Arc::new(transport),
        Arc::new(store),
        config.auth_policy(),
        Arc::new(ConsoleNavigator),
    );

    let succeeded = match cli.command {
        Command::Shell => shell(&client).await?,
        command => execute(&client, command).await?,
    };

    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run one command. Backend and session failures are reported as alerts and
/// yield `false`; local failures (unreadable file, missing password) are errors.
async fn execute(client: &SessionClient, command: Command) -> Result<bool> {
    let outcome = match command {
        Command::Login {
            username,
            temporary,
        } => {
            let remember = !temporary;
            let password = password_from_env()?;
            if !remember {
                warn!("temporary session, it ends when this process exits");
            }
            client
                .login(&username, &password, remember)
                .await
                .map(|user| {
                    let role = user.as_ref().and_then(|u| u.role()).map(|r| r.label());
                    print_json(&serde_json::json!({
                        "signed_in": true,
                        "username": username,
                        "role": role,
                        "remembered": remember,
                    }));
                })
        }
        Command::Logout => client.logout().await,
        Command::Status => {
            status(client).await;
            Ok(())
        }
        Command::Get { path } => send(client, RequestDescriptor::get(path)).await,
        Command::Delete { path } => send(client, RequestDescriptor::delete(path)).await,
        Command::Post { path, body } => {
            send(client, RequestDescriptor::post_json(path, &json_body(&body)?)?).await
        }
        Command::Put { path, body } => {
            send(client, RequestDescriptor::put_json(path, &json_body(&body)?)?).await
        }
        Command::Patch { path, body } => {
            send(client, RequestDescriptor::patch_json(path, &json_body(&body)?)?).await
        }
        Command::Upload { url, file } => {
            let contents = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            info!(file = %file.display(), bytes = contents.len(), "uploading");
            client
                .upload_presigned(
                    &url,
                    Bytes::from(contents),
                    HeaderValue::from_static(content_type_for(&file)),
                )
                .await
                .map(|response| print_response(&response))
        }
        Command::Shell => {
            warn!("already in the shell");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => Ok(true),
        Err(e) => {
            report(client, &e);
            Ok(false)
        }
    }
}

async fn send(client: &SessionClient, request: RequestDescriptor) -> backoffice_session::Result<()> {
    let response = client.request(request).await?;
    print_response(&response);
    Ok(())
}

async fn status(client: &SessionClient) {
    let Some((scope, pair)) = client.store().credentials().await else {
        print_json(&serde_json::json!({"signed_in": false}));
        return;
    };
    let user = client.store().user().await;
    print_json(&serde_json::json!({
        "signed_in": true,
        "scope": scope.label(),
        "access_expires": pair.access_expires,
        "refresh_expires": pair.refresh_expires,
        "role": user.as_ref().and_then(|u| u.role()).map(|r| r.label()),
        "can_manage_all": user.as_ref().is_some_and(|u| u.can_manage_all()),
    }));
}

/// Read commands from stdin until EOF or `exit`. Failures do not end the shell.
async fn shell(client: &SessionClient) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut all_succeeded = true;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        let succeeded = match Command::parse_line(line) {
            Ok(command) => match execute(client, command).await {
                Ok(succeeded) => succeeded,
                Err(e) => {
                    eprintln!("{e:#}");
                    false
                }
            },
            // Help output arrives as an error; it is not a failure
            Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => {
                println!("{e}");
                true
            }
            Err(e) => {
                eprintln!("{e}");
                false
            }
        };
        all_succeeded &= succeeded;
    }
    Ok(all_succeeded)
}

fn report(client: &SessionClient, error: &backoffice_session::Error) {
    warn!(error = %error, status = ?error.status(), "request failed");
    if let Some(text) = Alert::for_error(error, &client.expiry_gate()).text() {
        eprintln!("{text}");
    }
}

fn print_response(response: &Response) {
    if response.body.is_empty() {
        return;
    }
    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Ok(value) => print_json(&value),
        Err(_) => println!("{}", response.text()),
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
