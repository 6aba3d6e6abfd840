use serde::Deserialize;

/// What the aggregator does with a probe that failed at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run on the first failed probe.
    #[default]
    Abort,
    /// Log the failure and leave the probe out of the averages.
    Exclude,
}

/// Contents of the optional YAML configuration file.
/// Every key is optional; command-line flags and environment variables win over it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// The URL to probe.
    pub url: Option<String>,

    /// Name servers used for DNS lookups.
    #[serde(default)]
    pub dns_hosts: Vec<String>,

    pub failure_policy: Option<FailurePolicy>,

    /// User-Agent header sent with every probe.
    pub user_agent: Option<String>,
}
