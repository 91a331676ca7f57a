//! `lr-demo`: a small service wired from every piece of the crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use lr::files::{FileDownloader, FileUploader, UploadedFile};
use lr::logging::{init_logging, LogConfig, LogFormat};
use lr::middleware::{AccessLogBuilder, ErrorPageBuilder, RecoverBuilder, TracingBuilder};
use lr::runtime_config::RuntimeConfig;
use lr::session::cookie::CookiePropagator;
use lr::session::memory::MemoryStore;
use lr::session::Manager;
use lr::template::MiniJinjaEngine;
use lr::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "lr-demo", version)]
#[command(about = "Demo service for the lr request-dispatch core", long_about = None)]
struct Args {
    /// Listening address (overrides LR_ADDR)
    #[arg(long)]
    addr: Option<String>,

    /// Worker threads (overrides LR_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Log output format (overrides LR_LOG_FORMAT)
    #[arg(long, value_parser = ["json", "pretty"])]
    log_format: Option<String>,

    /// Directory served by GET /download?file=<name>
    #[arg(long)]
    files_dir: Option<PathBuf>,

    /// Directory that POST /upload stores the `upload` form file into
    #[arg(long)]
    uploads_dir: Option<PathBuf>,

    /// Idle lifetime of a login session, in seconds
    #[arg(long, default_value_t = 1800)]
    session_ttl_secs: u64,

    /// How often expired sessions are purged, in seconds
    #[arg(long, default_value_t = 60)]
    session_purge_secs: u64,
}

#[derive(Debug, Deserialize)]
struct Greeting {
    name: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut log_config = LogConfig::from_env();
    if let Some(format) = &args.log_format {
        log_config.format = LogFormat::parse(format);
    }
    init_logging(&log_config)?;

    let mut config = RuntimeConfig::from_env();
    if let Some(addr) = &args.addr {
        config.addr.clone_from(addr);
    }
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }

    let server = build_server(config, &args)?;
    let handle = server
        .start_configured()
        .context("failed to start server")?;
    info!(addr = %handle.addr(), "lr-demo ready");
    handle.join();
    Ok(())
}

fn build_server(config: RuntimeConfig, args: &Args) -> anyhow::Result<HttpServer> {
    let mut server = HttpServer::with_config(config);
    server
        .use_middleware(TracingBuilder::new().build())
        .use_middleware(AccessLogBuilder::new().build())
        .use_middleware(
            ErrorPageBuilder::new()
                .add_code(404, "<h1>Page not found</h1>")
                .add_code(500, "<h1>Something went wrong</h1>")
                .build(),
        )
        .use_middleware(RecoverBuilder::default().build());

    server.get("/", |ctx| ctx.respond_text(200, "lr demo"))?;

    server.get("/user/home", |ctx| ctx.respond_text(200, "home page"))?;
    server.get("/user/:id", |ctx| match ctx.path_value("id").int64() {
        Ok(id) => {
            if let Err(err) = ctx.respond_json_ok(&json!({ "id": id })) {
                ctx.respond_text(500, err.to_string());
            }
        }
        Err(err) => ctx.respond_text(400, err.to_string()),
    })?;

    server.get("/search", |ctx| {
        let query = ctx.query_value("q");
        let page = ctx.query_value("page").uint32().unwrap_or(1);
        match query.string() {
            Ok(q) => {
                let body = json!({ "q": q, "page": page });
                if let Err(err) = ctx.respond_json_ok(&body) {
                    ctx.respond_text(500, err.to_string());
                }
            }
            Err(err) => ctx.respond_text(400, err.to_string()),
        }
    })?;

    server.post("/greet", |ctx| match ctx.bind_json::<Greeting>() {
        Ok(greeting) => ctx.respond_text(200, format!("hello, {}", greeting.name)),
        Err(err) => ctx.respond_text(400, err.to_string()),
    })?;

    let mut engine = MiniJinjaEngine::new();
    engine.add_template("hello.html", "<h1>Hello {{ name }}</h1>")?;
    let engine = Arc::new(engine);
    server.get("/hello/:name", move |ctx| {
        let name = ctx.path_value("name").string().unwrap_or_default().to_string();
        if let Err(err) = ctx.render(engine.as_ref(), "hello.html", &json!({ "name": name })) {
            warn!(error = %err, "failed to render greeting");
        }
    })?;

    let store = MemoryStore::with_janitor(
        Duration::from_secs(args.session_ttl_secs),
        Duration::from_secs(args.session_purge_secs.max(1)),
    )
    .context("failed to start session janitor")?;
    let sessions = Manager::new(store, Arc::new(CookiePropagator::default()));
    let login = sessions.clone();
    server.post("/login", move |ctx| {
        let user = ctx.form_value("user");
        let user = match user.string() {
            Ok(u) if !u.is_empty() => u.to_string(),
            Ok(_) => return ctx.respond_text(400, "user must not be empty"),
            Err(err) => return ctx.respond_text(400, err.to_string()),
        };
        let result = login
            .init_session(ctx)
            .and_then(|session| session.set("user", json!(user)));
        match result {
            Ok(()) => ctx.respond_text(200, "logged in"),
            Err(err) => ctx.respond_text(500, err.to_string()),
        }
    })?;
    let profile = sessions.clone();
    server.get("/profile", move |ctx| {
        let user = profile
            .get_session(ctx)
            .and_then(|session| session.get("user"));
        match user {
            Ok(user) => {
                if profile.refresh_session(ctx).is_err() {
                    return ctx.respond_text(401, "session expired");
                }
                if let Err(err) = ctx.respond_json_ok(&json!({ "user": user })) {
                    ctx.respond_text(500, err.to_string());
                }
            }
            Err(_) => ctx.respond_text(401, "not logged in"),
        }
    })?;
    let logout = sessions;
    server.post("/logout", move |ctx| match logout.remove_session(ctx) {
        Ok(()) => ctx.respond_text(200, "logged out"),
        Err(_) => ctx.respond_text(401, "not logged in"),
    })?;

    if let Some(dir) = &args.files_dir {
        server.add_route(
            http::Method::GET,
            "/download",
            FileDownloader::new(dir.clone()).handler(),
        )?;
    }

    if let Some(dir) = &args.uploads_dir {
        let dir = dir.clone();
        let uploader = FileUploader::new("upload", move |file: &UploadedFile| {
            // Keep only the final component of the client's name
            let name = file
                .file_name
                .as_deref()
                .and_then(|n| Path::new(n).file_name())
                .map_or_else(|| "upload.bin".into(), |n| n.to_os_string());
            dir.join(name)
        });
        server.add_route(http::Method::POST, "/upload", uploader.handler())?;
    }

    Ok(server)
}
