use std::io::{self, BufRead, Write};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rosterd::gateway::{HttpGateway, RecordGateway};
use rosterd::{config, ipc};

fn main() -> anyhow::Result<()> {
    let cfg = config::load();

    // Logs go to stderr; stdout is the IPC channel.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rosterd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let gateway: Option<Box<dyn RecordGateway>> = match cfg.gateway_url.as_deref() {
        Some(url) => match HttpGateway::new(url) {
            Ok(g) => {
                tracing::info!(url, "record gateway configured from environment");
                Some(Box::new(g))
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring {}", config::GATEWAY_URL_ENV);
                None
            }
        },
        None => None,
    };
    let mut state = ipc::AppState::new(gateway);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't address a reply without an id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                writeln!(stdout, "{resp}").context("writing ipc response")?;
                stdout.flush().context("flushing ipc response")?;
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let text = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        writeln!(stdout, "{text}").context("writing ipc response")?;
        stdout.flush().context("flushing ipc response")?;
    }

    Ok(())
}
