use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
};
use url::Url;

use super::ConfigError;
use super::args::Args;
use super::model::{FailurePolicy, FileConfig};

/// Number of concurrent probes issued per run.
pub const PROBE_COUNT: usize = 150;

pub const DEFAULT_URL: &str = "https://www.google.com";
pub const DEFAULT_USER_AGENT: &str = concat!("tripper/", env!("CARGO_PKG_VERSION"));

/// Resolved settings for one run, threaded into the probe client and aggregator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub url: Url,
    pub json: bool,
    pub debug: bool,
    pub dns_hosts: Vec<IpAddr>,
    pub failure_policy: FailurePolicy,
    pub user_agent: String,
}

/// Load the application configuration from the command line, the environment
/// and the optional YAML file named by `--config` / `CONFIG_FILE`.
/// Flags and environment variables take precedence over the file.
pub fn load_config(args: &Args) -> Result<AppConfig, ConfigError> {
    let file = match &args.config {
        Some(path) => read_file_config(path)?,
        None => FileConfig::default(),
    };

    let url = args
        .url
        .clone()
        .or(file.url)
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let url = parse_target_url(&url)?;

    let dns_hosts = if args.dns_hosts.is_empty() {
        file.dns_hosts
    } else {
        args.dns_hosts.clone()
    };
    let dns_hosts = parse_dns_hosts(&dns_hosts)?;
    if !dns_hosts.is_empty() {
        log::info!("Using DNS hosts: {:?}", dns_hosts);
    }

    let failure_policy = if args.exclude_failed {
        FailurePolicy::Exclude
    } else {
        file.failure_policy.unwrap_or_default()
    };

    Ok(AppConfig {
        url,
        json: args.json,
        debug: args.debug,
        dns_hosts,
        failure_policy,
        user_agent: file
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    })
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&config_str).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate the probe target. Only http and https URLs with a host are accepted.
pub fn parse_target_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::MissingHost(raw.to_string()));
    }

    Ok(url)
}

fn parse_dns_hosts(hosts: &[String]) -> Result<Vec<IpAddr>, ConfigError> {
    hosts
        .iter()
        .map(|host| host.trim())
        .filter(|host| !host.is_empty())
        .map(|host| {
            host.parse().map_err(|source| ConfigError::InvalidDnsHost {
                host: host.to_string(),
                source,
            })
        })
        .collect()
}

/// Setup a DNS resolver using the provided DNS hosts.
/// Caching is disabled so every probe pays for a real lookup.
pub fn setup_resolver(dns_hosts: &[IpAddr]) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = Duration::from_secs(2);
    opts.cache_size = 0;

    let mut name_servers = NameServerConfigGroup::new();

    for ip in dns_hosts {
        name_servers.push(NameServerConfig {
            socket_addr: (*ip, 53).into(),
            protocol: Protocol::Tcp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    TokioAsyncResolver::tokio(resolver_config, opts)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn args(url: Option<&str>) -> Args {
        Args {
            url: url.map(str::to_string),
            ..Args::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = load_config(&args(None)).expect("default config");
        assert_eq!(config.url.as_str(), "https://www.google.com/");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.dns_hosts.is_empty());
        assert!(config.user_agent.starts_with("tripper/"));
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            parse_target_url("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_target_url("ftp://example.com"),
            Err(ConfigError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
        assert!(parse_target_url("http://127.0.0.1:8080/health").is_ok());
    }

    #[test]
    fn test_dns_hosts_are_trimmed_and_validated() {
        let hosts = vec!["1.1.1.1".to_string(), " 8.8.8.8".to_string(), String::new()];
        let parsed = parse_dns_hosts(&hosts).expect("valid hosts");
        assert_eq!(parsed.len(), 2);

        let bad = vec!["dns.google".to_string()];
        assert!(matches!(
            parse_dns_hosts(&bad),
            Err(ConfigError::InvalidDnsHost { .. })
        ));
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = std::env::temp_dir();
        file.push(format!("tripper-config-{}.yml", std::process::id()));
        let mut handle = std::fs::File::create(&file).expect("create config file");
        writeln!(
            handle,
            "url: http://file.example\nfailure_policy: exclude\nuser_agent: from-file\ndns_hosts: [9.9.9.9]"
        )
        .expect("write config file");

        let from_file = load_config(&Args {
            config: Some(file.clone()),
            ..Args::default()
        })
        .expect("file config");
        assert_eq!(from_file.url.as_str(), "http://file.example/");
        assert_eq!(from_file.failure_policy, FailurePolicy::Exclude);
        assert_eq!(from_file.user_agent, "from-file");
        assert_eq!(from_file.dns_hosts, vec!["9.9.9.9".parse::<IpAddr>().unwrap()]);

        let overridden = load_config(&Args {
            url: Some("https://flag.example".to_string()),
            config: Some(file.clone()),
            dns_hosts: vec!["1.1.1.1".to_string()],
            ..Args::default()
        })
        .expect("overridden config");
        assert_eq!(overridden.url.as_str(), "https://flag.example/");
        assert_eq!(overridden.dns_hosts, vec!["1.1.1.1".parse::<IpAddr>().unwrap()]);

        let _ = std::fs::remove_file(file);
    }

    #[test]
    fn test_missing_config_file() {
        let result = load_config(&Args {
            config: Some("/nonexistent/tripper.yml".into()),
            ..Args::default()
        });
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
