use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use mesosphere::engine::MemoryEngine;
use mesosphere::DistanceMetric;
use mesosphere_devserver::{router, AppState};
use tracing_subscriber::EnvFilter;

/// Serves an in-memory collection engine over HTTP.
#[derive(Debug, Parser)]
#[command(name = "mesosphere-devserver", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "MESOSPHERE_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Require this key in the X-API-Key header.
    #[arg(long, env = "MESOSPHERE_API_KEY")]
    api_key: Option<String>,

    /// Distance used for ranking: cosine, l2 or ip.
    #[arg(long, env = "MESOSPHERE_METRIC", default_value = "cosine")]
    metric: DistanceMetric,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    if args.api_key.is_none() {
        tracing::warn!("no API key configured; every request is accepted");
    }

    let engine = Arc::new(MemoryEngine::with_metric(args.metric));
    let app = router(AppState::new(engine, args.api_key));

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, metric = %args.metric, "listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_every_option_has_env_fallback() {
        let command = Args::command();
        for (id, env) in [
            ("bind", "MESOSPHERE_BIND"),
            ("api_key", "MESOSPHERE_API_KEY"),
            ("metric", "MESOSPHERE_METRIC"),
        ] {
            let arg = command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .unwrap();
            assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new(env)), "{id}");
        }
    }

    #[test]
    fn test_metric_flag_parses() {
        let args = Args::try_parse_from(["mesosphere-devserver", "--metric", "l2"]).unwrap();
        assert_eq!(args.metric, DistanceMetric::L2);
    }
}
