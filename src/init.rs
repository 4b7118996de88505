// Initialization utilities
//
// Logging/tracing setup and the AWS clients shared by every command

use anyhow::{Context, Result};
use kiroboard_aws::{
    load_sdk_config, regional_endpoint, AthenaClient, AwsSigV4HttpClient, GlueClient,
    IdentityStoreClient, QuickSightClient,
};
use kiroboard_config::{AppConfig, LogFormat, LoggingConfig};
use kiroboard_core::{AccountScope, AthenaQueryService, PollPolicy, QueryRunner};
use tracing::info;

/// Initialize tracing/logging from the logging section
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match logging.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}

/// Signed clients for one account and region
///
/// Built once in `main` and handed to each command.
pub struct Services {
    http: AwsSigV4HttpClient,
    scope: AccountScope,
}

impl Services {
    /// Resolve credentials through the standard AWS chain
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let sdk_config = load_sdk_config(&config.aws.region).await;
        let http = AwsSigV4HttpClient::new(&sdk_config, "quicksight")
            .context("Failed to initialize AWS credentials")?;

        info!(
            region = %config.aws.region,
            account_id = %config.aws.account_id,
            "AWS clients ready"
        );

        Ok(Self {
            http,
            scope: AccountScope::new(&config.aws.region, &config.aws.account_id),
        })
    }

    pub fn scope(&self) -> &AccountScope {
        &self.scope
    }

    fn endpoint(&self, service: &str) -> String {
        regional_endpoint(service, &self.scope.region)
    }

    pub fn quicksight(&self) -> QuickSightClient<AwsSigV4HttpClient> {
        QuickSightClient::new(
            self.http.for_service("quicksight"),
            self.endpoint("quicksight"),
            self.scope.account_id.clone(),
        )
    }

    pub fn athena(&self) -> AthenaClient<AwsSigV4HttpClient> {
        AthenaClient::new(self.http.for_service("athena"), self.endpoint("athena"))
    }

    pub fn glue(&self) -> GlueClient<AwsSigV4HttpClient> {
        GlueClient::new(self.http.for_service("glue"), self.endpoint("glue"))
    }

    pub fn identity_store(&self) -> IdentityStoreClient<AwsSigV4HttpClient> {
        IdentityStoreClient::new(
            self.http.for_service("identitystore"),
            self.endpoint("identitystore"),
        )
    }

    /// Query runner bound to the configured workgroup and poll policy
    pub fn query_runner(
        &self,
        config: &AppConfig,
    ) -> QueryRunner<AthenaQueryService<AwsSigV4HttpClient>> {
        QueryRunner::new(
            AthenaQueryService::new(self.athena(), &config.athena.workgroup),
            PollPolicy {
                interval: config.athena.poll_interval(),
                timeout: config.athena.query_timeout(),
            },
        )
    }
}

/// S3 operator rooted at `bucket`; credentials come from the environment
pub fn s3_operator(bucket: &str, region: &str) -> Result<opendal::Operator> {
    let builder = opendal::services::S3::default().bucket(bucket).region(region);

    let operator = opendal::Operator::new(builder)
        .with_context(|| format!("Failed to create S3 operator for bucket {}", bucket))?
        .finish();
    Ok(operator)
}
