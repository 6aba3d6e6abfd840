use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;

use tokio::net::lookup_host;
use tokio_rustls::TlsConnector;
use trust_dns_resolver::TokioAsyncResolver;

use super::error::ProbeError;
use crate::config::ConfigError;
use crate::config::app_config::{AppConfig, setup_resolver};
use crate::config::tls::insecure_client_config;
use crate::trace::ClientTrace;

pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<SocketAddr>>> + Send + 'a>>;

/// Name lookup used when no custom name server is configured or they failed.
pub trait HostLookup: Send + Sync {
    fn lookup<'a>(&'a self, host: &'a str, port: u16) -> LookupFuture<'a>;
}

/// The operating system resolver.
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    fn lookup<'a>(&'a self, host: &'a str, port: u16) -> LookupFuture<'a> {
        Box::pin(async move { Ok(lookup_host((host, port)).await?.collect()) })
    }
}

/// Shared, read-only state every probe worker uses: the resolvers, the TLS
/// connector and the headers to send. Holds no connections.
pub struct ProbeClient {
    resolver: Option<TokioAsyncResolver>,
    fallback: Box<dyn HostLookup>,
    tls: TlsConnector,
    user_agent: String,
}

impl ProbeClient {
    pub fn new(
        resolver: Option<TokioAsyncResolver>,
        fallback: Box<dyn HostLookup>,
        tls: TlsConnector,
        user_agent: String,
    ) -> Self {
        Self {
            resolver,
            fallback,
            tls,
            user_agent,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let tls = insecure_client_config().map_err(ConfigError::Tls)?;
        let resolver = if config.dns_hosts.is_empty() {
            None
        } else {
            Some(setup_resolver(&config.dns_hosts))
        };

        Ok(Self::new(
            resolver,
            Box::new(SystemLookup),
            TlsConnector::from(tls),
            config.user_agent.clone(),
        ))
    }

    pub fn tls(&self) -> &TlsConnector {
        &self.tls
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolve `host` to the socket addresses to dial, reporting the lookup to `trace`.
    ///
    /// IP literals are returned as is without any DNS event. When custom name
    /// servers fail, the error is reported with the result of the system
    /// resolver, which is tried next. The timeline keeps the first error.
    pub async fn resolve(
        &self,
        host: &str,
        port: u16,
        trace: &dyn ClientTrace,
    ) -> Result<Vec<SocketAddr>, ProbeError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        trace.dns_start(host);

        let mut dns_error = None;
        if let Some(resolver) = &self.resolver {
            match resolver.lookup_ip(host).await {
                Ok(lookup) => {
                    let ips: Vec<IpAddr> = lookup.iter().collect();
                    trace.dns_done(&ips, None);
                    return Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect());
                }
                Err(err) => {
                    log::debug!("custom resolver failed for {host}: {err}, using system resolver");
                    dns_error = Some(err.to_string());
                }
            }
        }

        match self.fallback.lookup(host, port).await {
            Ok(addrs) => {
                let ips: Vec<IpAddr> = addrs.iter().map(SocketAddr::ip).collect();
                trace.dns_done(&ips, dns_error.as_deref());
                Ok(addrs)
            }
            Err(err) => {
                let message = err.to_string();
                trace.dns_done(&[], Some(dns_error.as_deref().unwrap_or(&message)));
                Err(ProbeError::Resolve {
                    host: host.to_string(),
                    message,
                })
            }
        }
    }
}
