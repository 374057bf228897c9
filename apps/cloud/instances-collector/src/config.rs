//! Configuration for the instances collector

use core_config::{env_optional, env_or_default, env_parse, ConfigError, Environment, FromEnv};
use domain_instances::{Partition, ServiceKind};
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DEFAULT_MAX_WORKERS;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Root of the generated JSON tree
    pub output_dir: PathBuf,
    pub max_workers: usize,
    pub http_timeout: Duration,
    pub verbose: bool,
    pub aws: AwsConfig,
    pub azure: AzureConfig,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Price list API host serving `/offers/v1.0/aws/index.json`
    pub pricing_base_url: String,
    /// Price list API host serving `/offers/v1.0/cn/index.json`
    pub china_pricing_base_url: String,
    pub spot_feed_url: String,
    pub dedicated_host_base_url: String,
    pub emr_pricing_url: String,
}

impl AwsConfig {
    pub fn pricing_base(&self, partition: Partition) -> &str {
        match partition {
            Partition::Global => &self.pricing_base_url,
            Partition::China => &self.china_pricing_base_url,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub subscription_id: Option<String>,
    pub retail_prices_url: String,
    pub login_url: String,
    pub management_url: String,
}

/// Azure credentials, present only after validation
#[derive(Debug, Clone)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
}

const DEFAULT_OUTPUT_DIR: &str = "www";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PRICING_BASE_URL: &str = "https://pricing.us-east-1.amazonaws.com";
const DEFAULT_CHINA_PRICING_BASE_URL: &str = "https://pricing.cn-north-1.amazonaws.com.cn";
const DEFAULT_SPOT_FEED_URL: &str = "https://website.spot.ec2.aws.a2z.com/spot.js";
const DEFAULT_DEDICATED_HOST_BASE_URL: &str =
    "https://b0.p.awsstatic.com/pricing/2.0/meteredUnitMaps/ec2/USD/current";
const DEFAULT_EMR_PRICING_URL: &str = "https://b0.p.awsstatic.com/pricing/2.0/meteredUnitMaps/elasticmapreduce/USD/current/elasticmapreduce.json";
const DEFAULT_RETAIL_PRICES_URL: &str = "https://prices.azure.com/api/retail/prices";
const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let max_workers = env_parse("COLLECTOR_MAX_WORKERS", DEFAULT_MAX_WORKERS)?;
        if max_workers == 0 {
            return Err(ConfigError::ParseError {
                key: "COLLECTOR_MAX_WORKERS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            environment: Environment::from_env(),
            output_dir: PathBuf::from(env_or_default("COLLECTOR_OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            max_workers,
            http_timeout: Duration::from_secs(env_parse(
                "COLLECTOR_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            verbose: env_parse("COLLECTOR_VERBOSE", false)?,
            aws: AwsConfig {
                pricing_base_url: env_or_default("AWS_PRICING_BASE_URL", DEFAULT_PRICING_BASE_URL),
                china_pricing_base_url: env_or_default(
                    "AWS_CHINA_PRICING_BASE_URL",
                    DEFAULT_CHINA_PRICING_BASE_URL,
                ),
                spot_feed_url: env_or_default("AWS_SPOT_FEED_URL", DEFAULT_SPOT_FEED_URL),
                dedicated_host_base_url: env_or_default(
                    "AWS_DEDICATED_HOST_BASE_URL",
                    DEFAULT_DEDICATED_HOST_BASE_URL,
                ),
                emr_pricing_url: env_or_default("AWS_EMR_PRICING_URL", DEFAULT_EMR_PRICING_URL),
            },
            azure: AzureConfig {
                tenant_id: env_optional("AZURE_TENANT_ID"),
                client_id: env_optional("AZURE_CLIENT_ID"),
                client_secret: env_optional("AZURE_CLIENT_SECRET"),
                subscription_id: env_optional("AZURE_SUBSCRIPTION_ID"),
                retail_prices_url: env_or_default("AZURE_RETAIL_PRICES_URL", DEFAULT_RETAIL_PRICES_URL),
                login_url: env_or_default("AZURE_LOGIN_URL", DEFAULT_LOGIN_URL),
                management_url: env_or_default("AZURE_MANAGEMENT_URL", DEFAULT_MANAGEMENT_URL),
            },
        })
    }
}

impl Config {
    /// Fails before any fetch starts when a selected service lacks
    /// credentials.
    pub fn validate_for(&self, services: &[ServiceKind]) -> Result<(), ConfigError> {
        if services.contains(&ServiceKind::Azure) {
            self.azure.credentials()?;
        }
        Ok(())
    }
}

impl AzureConfig {
    pub fn credentials(&self) -> Result<AzureCredentials, ConfigError> {
        fn required(value: &Option<String>, key: &str) -> Result<String, ConfigError> {
            value
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        }

        Ok(AzureCredentials {
            tenant_id: required(&self.tenant_id, "AZURE_TENANT_ID")?,
            client_id: required(&self.client_id, "AZURE_CLIENT_ID")?,
            client_secret: required(&self.client_secret, "AZURE_CLIENT_SECRET")?,
            subscription_id: required(&self.subscription_id, "AZURE_SUBSCRIPTION_ID")?,
        })
    }
}
