//! Language server entry point. Speaks LSP over stdio; logs go to
//! stderr so they never corrupt the transport. The log filter sits
//! behind a reload handle so the client's `debug` setting can raise the
//! level at runtime.

use nextflow_language_server::backend::Backend;
use tower_lsp::{LspService, Server};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, filter_handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install the log subscriber: {e}"))?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) =
        LspService::new(move |client| Backend::new(client).with_log_filter(filter_handle));
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
