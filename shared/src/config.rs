//! Configuration management for Lambda functions.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Backoff and delay settings for waiting on OpenSearch Serverless.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitConfig {
    /// First sleep between collection status polls
    pub initial_interval: Duration,
    /// Upper bound for a single sleep between polls
    pub max_interval: Duration,
    /// Factor applied to the interval after each poll
    pub backoff_multiplier: f64,
    /// Total time allowed for the collection to leave CREATING
    pub max_wait: Duration,
    /// Delay before the first index request, while data access policies propagate
    pub policy_propagation_delay: Duration,
    /// Delay after the index is created
    pub index_settle_delay: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(120),
            backoff_multiplier: 2.0,
            max_wait: Duration::from_secs(600),
            policy_propagation_delay: Duration::from_secs(45),
            index_settle_delay: Duration::from_secs(180),
        }
    }
}

impl WaitConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let backoff_multiplier = match lookup("POLL_BACKOFF_MULTIPLIER") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|m| m.is_finite() && *m >= 1.0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "POLL_BACKOFF_MULTIPLIER must be a number >= 1.0, got {:?}",
                        raw
                    ))
                })?,
            None => defaults.backoff_multiplier,
        };

        Ok(Self {
            initial_interval: nonzero_secs(
                lookup,
                "POLL_INITIAL_INTERVAL_SECS",
                defaults.initial_interval,
            )?,
            max_interval: nonzero_secs(lookup, "POLL_MAX_INTERVAL_SECS", defaults.max_interval)?,
            backoff_multiplier,
            max_wait: secs(lookup, "POLL_MAX_WAIT_SECS", defaults.max_wait)?,
            policy_propagation_delay: secs(
                lookup,
                "POLICY_PROPAGATION_DELAY_SECS",
                defaults.policy_propagation_delay,
            )?,
            index_settle_delay: secs(lookup, "INDEX_SETTLE_DELAY_SECS", defaults.index_settle_delay)?,
        })
    }
}

/// Configuration for the index provisioner, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// AWS region hosting the collection
    pub region: String,
    /// OpenSearch Serverless collection name
    pub collection_name: String,
    /// Name of the vector index to create
    pub index_name: String,
    /// Poll and delay settings
    pub wait: WaitConfig,
}

impl ProvisionerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let region = lookup("REGION")
            .or_else(|| lookup("AWS_REGION"))
            .ok_or_else(|| Error::Config("REGION not set".to_string()))?;

        Ok(Self {
            region,
            collection_name: required(&lookup, "AOSS_COLLECTION_NAME")?,
            index_name: required(&lookup, "AOSS_INDEX_NAME")?,
            wait: WaitConfig::from_lookup(&lookup)?,
        })
    }
}

/// Configuration for the Lex to Bedrock agent bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bedrock agent ID
    pub agent_id: String,
    /// Bedrock agent alias ID
    pub agent_alias_id: String,
    /// DynamoDB table receiving conversation transcripts
    pub table_name: String,
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            agent_id: required(&lookup, "AGENT_ID")?,
            agent_alias_id: required(&lookup, "ALIAS_ID")?,
            table_name: required(&lookup, "TABLE_NAME")?,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} not set", key)))
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Result<Duration> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| Error::Config(format!("{} must be whole seconds: {}", key, e))),
        None => Ok(default),
    }
}

fn nonzero_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    let value = secs(lookup, key, default)?;
    if value.is_zero() {
        return Err(Error::Config(format!("{} must be at least 1 second", key)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_provisioner_defaults() {
        let config = ProvisionerConfig::from_lookup(lookup(&[
            ("REGION", "us-west-2"),
            ("AOSS_COLLECTION_NAME", "kb-collection"),
            ("AOSS_INDEX_NAME", "kb-index"),
        ]))
        .unwrap();

        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.collection_name, "kb-collection");
        assert_eq!(config.index_name, "kb-index");
        assert_eq!(config.wait, WaitConfig::default());
        assert_eq!(config.wait.policy_propagation_delay, Duration::from_secs(45));
        assert_eq!(config.wait.index_settle_delay, Duration::from_secs(180));
    }

    #[test]
    fn test_provisioner_region_falls_back_to_aws_region() {
        let config = ProvisionerConfig::from_lookup(lookup(&[
            ("AWS_REGION", "eu-central-1"),
            ("AOSS_COLLECTION_NAME", "c"),
            ("AOSS_INDEX_NAME", "i"),
        ]))
        .unwrap();

        assert_eq!(config.region, "eu-central-1");
    }

    #[test]
    fn test_wait_overrides() {
        let config = ProvisionerConfig::from_lookup(lookup(&[
            ("REGION", "us-east-1"),
            ("AOSS_COLLECTION_NAME", "c"),
            ("AOSS_INDEX_NAME", "i"),
            ("POLL_INITIAL_INTERVAL_SECS", "5"),
            ("POLL_MAX_WAIT_SECS", "60"),
            ("POLL_BACKOFF_MULTIPLIER", "1.5"),
            ("INDEX_SETTLE_DELAY_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.wait.initial_interval, Duration::from_secs(5));
        assert_eq!(config.wait.max_wait, Duration::from_secs(60));
        assert_eq!(config.wait.backoff_multiplier, 1.5);
        assert_eq!(config.wait.index_settle_delay, Duration::ZERO);
        assert_eq!(config.wait.max_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_rejects_bad_durations() {
        let err = ProvisionerConfig::from_lookup(lookup(&[
            ("REGION", "us-east-1"),
            ("AOSS_COLLECTION_NAME", "c"),
            ("AOSS_INDEX_NAME", "i"),
            ("POLL_MAX_WAIT_SECS", "ten minutes"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("POLL_MAX_WAIT_SECS"));

        let err = ProvisionerConfig::from_lookup(lookup(&[
            ("REGION", "us-east-1"),
            ("AOSS_COLLECTION_NAME", "c"),
            ("AOSS_INDEX_NAME", "i"),
            ("POLL_BACKOFF_MULTIPLIER", "0.5"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("POLL_BACKOFF_MULTIPLIER"));
    }

    #[test]
    fn test_rejects_zero_poll_intervals() {
        for key in ["POLL_INITIAL_INTERVAL_SECS", "POLL_MAX_INTERVAL_SECS"] {
            let err = ProvisionerConfig::from_lookup(lookup(&[
                ("REGION", "us-east-1"),
                ("AOSS_COLLECTION_NAME", "c"),
                ("AOSS_INDEX_NAME", "i"),
                (key, "0"),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, Error::Config(ref msg) if msg.contains(key)),
                "{} = 0 accepted: {:?}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_bridge_requires_all_values() {
        let err = BridgeConfig::from_lookup(lookup(&[("AGENT_ID", "A1"), ("ALIAS_ID", "TSTALIAS")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg == "TABLE_NAME not set"));

        let config = BridgeConfig::from_lookup(lookup(&[
            ("AGENT_ID", "A1"),
            ("ALIAS_ID", "TSTALIAS"),
            ("TABLE_NAME", "transcripts"),
        ]))
        .unwrap();
        assert_eq!(config.agent_alias_id, "TSTALIAS");
        assert_eq!(config.table_name, "transcripts");
    }
}
