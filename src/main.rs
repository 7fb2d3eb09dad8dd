use anyhow::{Context, Result};
use axum::Router;
use lambda_runtime::{LambdaEvent, service_fn};
use std::{env, io::ErrorKind, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    metadata_recorder::{MetadataRecorder, PgMetadataConnector},
    notifier::{Notifier, SnsPublisher},
    object_store::S3ObjectStore,
    processor::FileProcessor,
    secret_store::{CredentialProvider, SecretsManagerStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    init_tracing();

    // --- Parse config; a missing setting stops us before any AWS call ---
    let (cfg, runtime) = config::AppConfig::from_env_and_args().context("invalid configuration")?;

    tracing::info!(
        output_bucket = %cfg.output_bucket,
        backup_bucket = %cfg.backup_bucket,
        sns_topic_arn = %cfg.sns_topic_arn,
        "starting file-intake-handler"
    );

    // --- Initialize AWS clients once per process ---
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = runtime.region.clone() {
        loader = loader.region(aws_sdk_s3::config::Region::new(region));
    }
    let aws_config = loader.load().await;

    let store = S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config));
    tracing::debug!("initialized s3 client");
    let secrets = SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(&aws_config));
    tracing::debug!("initialized secrets manager client");
    let publisher = SnsPublisher::new(aws_sdk_sns::Client::new(&aws_config));
    tracing::debug!("initialized sns client");

    let topic_arn = cfg.sns_topic_arn.clone();
    let processor = Arc::new(FileProcessor::new(
        Arc::new(store),
        CredentialProvider::new(Arc::new(secrets)),
        MetadataRecorder::new(Arc::new(PgMetadataConnector)),
        Notifier::new(Arc::new(publisher), topic_arn),
        cfg,
    ));

    match runtime.listen {
        Some(addr) => serve(addr, processor).await,
        None => {
            tracing::info!("registering with the lambda runtime");
            let func = service_fn(move |event: LambdaEvent<serde_json::Value>| {
                let processor = processor.clone();
                async move { handlers::invoke_handlers::handle_lambda_event(processor, event).await }
            });
            lambda_runtime::run(func)
                .await
                .map_err(|err| anyhow::anyhow!(err))
        }
    }
}

/// JSON logs inside Lambda, readable logs everywhere else. `RUST_LOG`
/// overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var_os("AWS_LAMBDA_FUNCTION_NAME").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}

/// Run the local invoke server until it is stopped.
async fn serve(addr: SocketAddr, processor: Arc<FileProcessor>) -> Result<()> {
    let app: Router = routes::routes::routes().with_state(processor);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::PermissionDenied && addr.ip().is_unspecified() => {
            let fallback_addr = SocketAddr::from(([127, 0, 0, 1], addr.port()));
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Local invoke server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
