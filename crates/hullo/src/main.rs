//! hullo: a single-endpoint backend API server
//!
//! Serves `GET /` with a fixed greeting on port 8080, permissive CORS on
//! every response. No flags, no environment, no config file.

use hullo_core::{bind_listener, serve, Cors, ServerConfig, ServerState, StaticRoute};
use std::sync::Arc;

const GREETING: &str = "Hello from the backend API!";

fn main() -> hullo_core::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::default();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_io()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: ServerConfig) -> hullo_core::Result<()> {
    let mut state = ServerState::new();
    state.add_static(StaticRoute::get("/", GREETING))?;
    state.middleware(Cors::permissive());

    let listener = bind_listener(&config.addr()?)?;
    log::info!(
        "API server listening at http://{}",
        listener.local_addr()?
    );

    serve(listener, Arc::new(state)).await
}
