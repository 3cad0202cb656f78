//! ticket-ctl — command-line interface for the Ticket daemon.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const DEFAULT_PORT: u16 = 9410;
const DEFAULT_QUEUE: &str = "requests";

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitResponse {
    operation_id:     String,
    status_location:  String,
    retry_after_secs: u64,
}

#[derive(Deserialize)]
struct AdminStatusResponse {
    uptime_secs: u64,
    queue:       QueueDepths,
    artifacts:   usize,
}

#[derive(Deserialize)]
struct QueueDepths {
    ready:  usize,
    leased: usize,
    dead:   usize,
}

// ── HTTP helpers ──────────────────────────────────────────────────────────────

fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

/// Client that does not follow redirects, so a 302 Location stays visible.
fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("failed to build HTTP client")
}

fn retry_after_secs(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(2)
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<missing Location header>")
        .to_string()
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_submit(port: u16, queue: &str, object_type: &str, json_text: &str) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(json_text).context("payload must be valid JSON")?;

    let url = format!("{}/{}/{}", base_url(port), queue, object_type);
    let resp = client()?
        .post(&url)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("failed to connect to ticketd at {} — is it running?", url))?;

    let status = resp.status();
    if status != reqwest::StatusCode::ACCEPTED {
        let body = resp.text().await.unwrap_or_default();
        bail!("submit rejected ({}): {}", status, body);
    }

    let body: SubmitResponse = resp.json().await.context("failed to parse response")?;

    println!("═══════════════════════════════════════");
    println!("  Operation Accepted");
    println!("═══════════════════════════════════════");
    println!("  Operation id : {}", body.operation_id);
    println!("  Poll         : {}", body.status_location);
    println!("  Retry after  : {}s", body.retry_after_secs);

    Ok(())
}

async fn cmd_status(port: u16, operation_id: &str, stream: bool, sync: bool) -> Result<()> {
    let url = format!("{}/status/{}", base_url(port), operation_id);
    let on_complete = if stream { "Stream" } else { "Redirect" };
    let on_pending = if sync { "Synchronous" } else { "Accepted" };

    let resp = client()?
        .get(&url)
        .query(&[("onComplete", on_complete), ("onPending", on_pending)])
        .send()
        .await
        .with_context(|| format!("failed to connect to ticketd at {} — is it running?", url))?;

    match resp.status().as_u16() {
        202 => {
            println!("Pending. Poll again in {}s: {}", retry_after_secs(&resp), location(&resp));
        }
        302 => {
            println!("Complete. Artifact at: {}", location(&resp));
        }
        200 => {
            println!("{}", resp.text().await.unwrap_or_default());
        }
        404 => {
            println!("Not complete within the wait ceiling.");
        }
        422 => {
            println!("Failed: {}", resp.text().await.unwrap_or_default());
        }
        other => {
            let body = resp.text().await.unwrap_or_default();
            bail!("unexpected response ({}): {}", other, body);
        }
    }

    Ok(())
}

async fn cmd_watch(port: u16, operation_id: &str) -> Result<()> {
    let url = format!("{}/status/{}", base_url(port), operation_id);
    let http = client()?;

    loop {
        let resp = http
            .get(&url)
            .query(&[("onComplete", "Stream"), ("onPending", "Accepted")])
            .send()
            .await
            .with_context(|| format!("failed to connect to ticketd at {} — is it running?", url))?;

        match resp.status().as_u16() {
            202 => {
                let wait = retry_after_secs(&resp);
                println!("  pending, next poll in {}s...", wait);
                tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
            }
            200 => {
                println!("{}", resp.text().await.unwrap_or_default());
                return Ok(());
            }
            422 => {
                println!("Failed: {}", resp.text().await.unwrap_or_default());
                return Ok(());
            }
            other => {
                let body = resp.text().await.unwrap_or_default();
                bail!("unexpected response ({}): {}", other, body);
            }
        }
    }
}

async fn cmd_server(port: u16) -> Result<()> {
    let url = format!("{}/admin/status", base_url(port));
    let resp: AdminStatusResponse = client()?
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to connect to ticketd at {} — is it running?", url))?
        .json()
        .await
        .context("failed to parse response")?;

    println!("═══════════════════════════════════════");
    println!("  Ticket Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Uptime           : {}s", resp.uptime_secs);
    println!("  Queue ready      : {}", resp.queue.ready);
    println!("  Queue leased     : {}", resp.queue.leased);
    println!("  Dead-lettered    : {}", resp.queue.dead);
    println!("  Stored artifacts : {}", resp.artifacts);

    Ok(())
}

fn print_usage() {
    println!("Usage: ticket-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  submit [--queue <q>] [--type <t>] <json>   Submit a payload for processing");
    println!("  status <operation-id> [--stream] [--sync]  Poll an operation once");
    println!("  watch <operation-id>                       Poll until the operation is terminal");
    println!("  server                                     Show daemon status");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
    println!("  --queue <q>     Queue name (default: {})", DEFAULT_QUEUE);
    println!("  --type <t>      Object type for submit (default: requests)");
    println!("  --stream        Return the artifact inline instead of a redirect");
    println!("  --sync          Hold the poll open until the result or the wait ceiling");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args.get(i)
            .context("--port requires a value")?
            .parse()
            .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["submit", rest @ ..] => {
            let mut queue = DEFAULT_QUEUE.to_string();
            let mut object_type = "requests".to_string();
            let mut json_text: Option<&str> = None;
            let mut j = 0;
            while j < rest.len() {
                match rest[j] {
                    "--queue" => {
                        j += 1;
                        queue = rest.get(j).context("--queue requires a value")?.to_string();
                    }
                    "--type" => {
                        j += 1;
                        object_type = rest.get(j).context("--type requires a value")?.to_string();
                    }
                    other => json_text = Some(other),
                }
                j += 1;
            }
            let json_text = json_text.context("submit requires a JSON payload argument")?;
            cmd_submit(port, &queue, &object_type, json_text).await
        }
        ["status", id, flags @ ..] => {
            let stream = flags.contains(&"--stream");
            let sync = flags.contains(&"--sync");
            cmd_status(port, id, stream, sync).await
        }
        ["watch", id]                  => cmd_watch(port, id).await,
        ["server"]                     => cmd_server(port).await,
        ["help"] | ["--help"] | ["-h"] => { print_usage(); Ok(()) }
        [] => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
