use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether::config::Config;
use tether::http::request::Request;
use tether::http::response::{HandlerResult, RouteError, StatusCode};
use tether::http::writer::ResponseWriter;
use tether::server::path::clean_path;
use tether::server::{BoxHandler, ServerBuilder, handler_fn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)),
        )
        .init();

    let root = Arc::new(cfg.static_files.root.clone());
    let index_root = root.clone();

    let server = ServerBuilder::from_config(&cfg.server)
        .use_middleware(logging)
        .get("/", move |w: &mut ResponseWriter, _r: &Request| {
            w.send_file(index_root.join("index.html"))
        })
        .get("/style.css", {
            let root = root.clone();
            move |w: &mut ResponseWriter, r: &Request| serve_static(&root, w, r)
        })
        .get("/script.js", {
            let root = root.clone();
            move |w: &mut ResponseWriter, r: &Request| serve_static(&root, w, r)
        })
        .get("/search/{firstID}/ds/{secondID}", search)
        .get("/api/info", info_handler)
        .post("/login", login)
        .bind(cfg.server.listen_addr.as_str())
        .await?;

    let shutdown = server.shutdown_handle();
    let mut acceptor = tokio::spawn(server.run());

    tokio::select! {
        res = &mut acceptor => {
            res??;
        }

        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            shutdown.close();
            acceptor.await??;
        }
    }

    info!("Server gracefully stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Cannot listen for SIGTERM"),
        }
    }

    let _ = tokio::signal::ctrl_c().await;
}

fn logging(next: BoxHandler) -> BoxHandler {
    handler_fn(move |w, r| {
        info!("[{}] {} {}", r.method, r.path, r.version);
        next.call(w, r)
    })
}

fn serve_static(root: &Path, w: &mut ResponseWriter, r: &Request) -> HandlerResult {
    let path = match clean_path(&r.path) {
        "" | "/" => "/index.html",
        p => p,
    };

    if path.split('/').any(|seg| seg == "..") {
        return Err(RouteError::not_found("File not found"));
    }

    let full: PathBuf = root.join(path.trim_start_matches('/'));
    w.send_file(full)
}

fn search(w: &mut ResponseWriter, r: &Request) -> HandlerResult {
    let first = r.param("firstID").unwrap_or_default();
    let second = r.param("secondID").unwrap_or_default();
    info!(first_id = first, second_id = second, "Search");

    w.send_json(&json!({ "firstID": first, "secondID": second }), StatusCode::Ok)
}

fn info_handler(w: &mut ResponseWriter, _r: &Request) -> HandlerResult {
    w.send_json(
        &json!({
            "status": "success",
            "message": "Server is running",
            "time": httpdate::fmt_http_date(SystemTime::now()),
        }),
        StatusCode::Ok,
    )
}

fn login(w: &mut ResponseWriter, r: &Request) -> HandlerResult {
    let form = r.form_pairs();
    if form.is_empty() {
        return Err(RouteError::bad_request("Invalid form data"));
    }

    if form_field(&form, "username") == "admin" && form_field(&form, "password") == "1234" {
        w.send_json(
            &json!({ "status": "success", "message": "Login successful" }),
            StatusCode::Ok,
        )
    } else {
        w.send_json(
            &json!({ "status": "error", "message": "Invalid credentials" }),
            StatusCode::Unauthorized,
        )
    }
}

fn form_field<'a>(form: &'a [(String, String)], name: &str) -> &'a str {
    form.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}
