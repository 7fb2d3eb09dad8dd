use clap::Parser;
use std::{env, net::SocketAddr};
use thiserror::Error;

/// Names of the environment variables every deployment must set.
pub const OUTPUT_BUCKET_VAR: &str = "OUTPUT_BUCKET";
pub const BACKUP_BUCKET_VAR: &str = "BACKUP_BUCKET";
pub const DB_SECRET_NAME_VAR: &str = "DB_SECRET_NAME";
pub const SNS_TOPIC_ARN_VAR: &str = "SNS_TOPIC_ARN";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required setting `{0}` is missing or empty")]
    Missing(&'static str),
    #[error("setting `{name}` is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Per-deployment settings consumed by the processing workflow.
/// All four values are required before the handler accepts an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub output_bucket: String,
    pub backup_bucket: String,
    pub db_secret_name: String,
    pub sns_topic_arn: String,
}

/// Runtime options that only shape how the binary is hosted.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Serve a local invoke endpoint instead of registering with Lambda.
    pub listen: Option<SocketAddr>,
    /// Region override for the AWS clients; the provider chain decides when unset.
    pub region: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Processes files dropped into an S3 bucket")]
pub struct Args {
    /// Serve `POST /invoke` on this address instead of running under Lambda
    #[arg(long, env = "FILE_INTAKE_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// AWS region for the S3, SNS and Secrets Manager clients (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and runtime options.
    pub fn from_env_and_args() -> Result<(Self, RuntimeOptions), ConfigError> {
        let args = Args::parse();
        let cfg = Self::from_lookup(|name| env::var(name).ok())?;

        Ok((
            cfg,
            RuntimeOptions {
                listen: args.listen,
                region: args.region,
            },
        ))
    }

    /// Build the config from any name → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(ConfigError::Missing(name)),
            }
        };

        let cfg = Self {
            output_bucket: required(OUTPUT_BUCKET_VAR)?,
            backup_bucket: required(BACKUP_BUCKET_VAR)?,
            db_secret_name: required(DB_SECRET_NAME_VAR)?,
            sns_topic_arn: required(SNS_TOPIC_ARN_VAR)?,
        };

        if !cfg.sns_topic_arn.starts_with("arn:") {
            return Err(ConfigError::Invalid {
                name: SNS_TOPIC_ARN_VAR,
                reason: format!("`{}` is not an ARN", cfg.sns_topic_arn),
            });
        }

        Ok(cfg)
    }
}
