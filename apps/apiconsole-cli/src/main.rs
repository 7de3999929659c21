//! apiconsole-cli - run a signed cloud API call from a JSON file.
//!
//! The call file holds the resolved call and, for asynchronous actions, how to
//! poll for the result:
//!
//! ```json
//! {
//!   "call": {
//!     "service": "cv",
//!     "action": "CVSync2AsyncSubmitTask",
//!     "version": "2022-08-31",
//!     "payload": { "req_key": "jimeng_t2i_v40", "prompt": "a cat" }
//!   },
//!   "poll": {
//!     "pollAction": "CVSync2AsyncGetResult",
//!     "pollVersion": "2022-08-31",
//!     "submitResponseIdPath": "data.task_id",
//!     "pollIdParamKey": "task_id",
//!     "pollStatusPath": "data.status",
//!     "pollSuccessValue": "done"
//!   }
//! }
//! ```
//!
//! Ctrl-C stops a run in progress.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ACCESS_KEY_ID` / `VOLC_ACCESSKEY` | *(required)* | Access key ID |
//! | `SECRET_ACCESS_KEY` / `VOLC_SECRETKEY` | *(required)* | Secret access key |
//! | `SESSION_TOKEN` / `VOLC_SESSION_TOKEN` | *(unset)* | Temporary session token |
//! | `APICONSOLE_ENDPOINT` | `https://open.volcengineapi.com` | Endpoint for calls without one |
//! | `APICONSOLE_REGION` | `cn-north-1` | Region for calls without one |
//! | `APICONSOLE_PROXY_URL` | *(unset)* | Forwarding-proxy URL prefix |
//! | `APICONSOLE_CONNECT_TIMEOUT_SECS` | `10` | Connect timeout |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use apiconsole_auth::{Credentials, Signer};
use apiconsole_client::{ConsoleClient, Dispatch, ReqwestDispatcher};
use apiconsole_core::{ApiCall, ConsoleConfig};
use apiconsole_poll::{
    AsyncPollSpec, ConsoleSession, PollOrchestrator, RunOutcome, RunSnapshot, RunState,
};
use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "apiconsole-cli", version)]
#[command(about = "Sign and send a cloud API call, polling asynchronous tasks to completion")]
struct Cli {
    /// Path to the call file
    call_file: PathBuf,

    /// Forwarding-proxy URL prefix (overrides APICONSOLE_PROXY_URL)
    #[arg(long)]
    proxy: Option<String>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Print the signed request instead of sending it
    #[arg(long)]
    dry_run: bool,
}

/// Contents of a call file.
#[derive(Debug, serde::Deserialize)]
struct CallFile {
    call: ApiCall,
    #[serde(default)]
    poll: Option<AsyncPollSpec>,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Parse a call file, filling in the endpoint and region from `config`
/// when the call leaves them out.
fn parse_call_file(source: &str, config: &ConsoleConfig) -> Result<CallFile> {
    let mut raw: Value = serde_json::from_str(source).context("call file is not valid JSON")?;

    let call = raw
        .get_mut("call")
        .and_then(Value::as_object_mut)
        .context("call file has no \"call\" object")?;
    let blank = |v: Option<&Value>| v.and_then(Value::as_str).is_none_or(|s| s.trim().is_empty());
    if blank(call.get("endpoint")) {
        call.insert(
            "endpoint".to_owned(),
            Value::String(config.default_endpoint.clone()),
        );
    }
    if blank(call.get("region")) {
        call.insert(
            "region".to_owned(),
            Value::String(config.default_region.as_str().to_owned()),
        );
    }

    serde_json::from_value(raw).context("invalid call file")
}

fn print_snapshot(snapshot: &RunSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("failed to encode snapshot: {e}"),
        }
        return;
    }

    let mut line = format!(
        "[{:>6}ms] {:?} polls={}",
        snapshot.elapsed_ms, snapshot.state, snapshot.poll_count
    );
    if let Some(task_id) = &snapshot.task_id {
        line.push_str(&format!(" task={task_id}"));
    }
    if let Some(response) = &snapshot.response {
        line.push_str(&format!(
            " http={} {} ({}ms)",
            response.status, response.status_text, response.elapsed_ms
        ));
    }
    println!("{line}");

    if !snapshot.polling {
        if let Some(error) = &snapshot.error {
            println!("error: {error}");
        }
        if let Some(response) = &snapshot.response {
            match serde_json::to_string_pretty(&response.body) {
                Ok(body) => println!("{body}"),
                Err(e) => eprintln!("failed to render body: {e}"),
            }
        }
    }
}

/// Render the signed request for `call` without sending it.
fn dry_run_report<D: Dispatch>(client: &ConsoleClient<D>, call: &ApiCall) -> Result<String> {
    let (request, signed) = client.prepare(call)?;
    let mut report = format!("{} {}\n", request.method, request.url);
    for (name, value) in &signed.headers {
        report.push_str(&format!("{name}: {value}\n"));
    }
    report.push_str(&format!(
        "\n--- canonical request ---\n{}\n\n--- string to sign ---\n{}\n",
        signed.canonical_request, signed.string_to_sign
    ));
    Ok(report)
}

/// Run `file` to a terminal state, printing snapshots as they arrive.
///
/// Ctrl-C stops the run; the cancelled outcome is still returned.
async fn run_call_file<D: Dispatch>(
    client: ConsoleClient<D>,
    file: &CallFile,
    json: bool,
) -> Result<RunOutcome> {
    let orchestrator = PollOrchestrator::new(client);
    let mut session = ConsoleSession::new();
    let token = session.begin_run();

    let (tx, mut rx) = mpsc::unbounded_channel::<RunSnapshot>();
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            print_snapshot(&snapshot, json);
        }
    });

    let outcome = {
        let run = orchestrator.run(&file.call, file.poll.as_ref(), token, &tx);
        tokio::pin!(run);
        let finished = tokio::select! {
            outcome = &mut run => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        match finished {
            Some(outcome) => outcome,
            None => {
                info!("received interrupt, stopping run");
                session.stop();
                run.await
            }
        }
    };

    drop(tx);
    printer.await.context("snapshot printer panicked")?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = ConsoleConfig::from_env();
    init_tracing(&config.log_level)?;

    let source = tokio::fs::read_to_string(&cli.call_file)
        .await
        .with_context(|| format!("failed to read {}", cli.call_file.display()))?;
    let file = parse_call_file(&source, &config)?;

    let credentials = Credentials::from_env().context("credentials are not configured")?;
    info!(
        access_key = %credentials.access_key_id,
        action = %file.call.action,
        "Loaded call"
    );

    let dispatcher =
        ReqwestDispatcher::from_config(&config).context("failed to build HTTP client")?;
    let client = ConsoleClient::new(Signer::new(credentials), dispatcher)
        .with_proxy(cli.proxy.or_else(|| config.proxy_url.clone()));

    if cli.dry_run {
        print!("{}", dry_run_report(&client, &file.call)?);
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = run_call_file(client, &file, cli.json).await?;
    Ok(if outcome.state == RunState::Succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
