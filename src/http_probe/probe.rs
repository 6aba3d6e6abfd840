use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Empty;
use hyper::header::{CONNECTION, HOST, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use url::{Host, Position, Url};

use super::prelude::*;
use super::stream::TracedStream;
use crate::trace::prelude::*;

/// Run one probe against `url` and publish its outcome to `results`.
///
/// The timeline is published whether or not the request succeeded; on
/// failure it holds whatever events fired before the error.
pub async fn run_probe(client: Arc<ProbeClient>, url: Url, results: mpsc::Sender<ProbeOutcome>) {
    let recorder = Arc::new(TimelineRecorder::new());

    let error = match probe_url(&client, &url, recorder.clone()).await {
        Ok(status) => {
            log::debug!("{url} responded {status}");
            None
        }
        Err(err) => Some(err),
    };

    let outcome = ProbeOutcome {
        timeline: recorder.snapshot(),
        error,
    };
    if results.send(outcome).await.is_err() {
        log::debug!("result collector closed before the probe of {url} reported");
    }
}

/// Perform a single traced GET on a fresh connection.
///
/// Every lifecycle event of the request is reported to `trace`. The response
/// body is not read; the probe is over once the response head arrives.
pub async fn probe_url(
    client: &ProbeClient,
    url: &Url,
    trace: Arc<dyn ClientTrace>,
) -> Result<StatusCode, ProbeError> {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(ProbeError::NoAddress(url.to_string())),
    };
    let port = url.port_or_known_default().unwrap_or(80);
    let request = build_request(url, client.user_agent())?;

    let addrs = client.resolve(&host, port, trace.as_ref()).await?;
    let tcp = connect(&host, &addrs, trace.as_ref()).await?;

    if url.scheme() == "https" {
        let server_name =
            ServerName::try_from(host.clone()).map_err(|_| ProbeError::ServerName(host.clone()))?;
        let tls = client
            .tls()
            .connect(server_name, tcp)
            .await
            .map_err(|source| ProbeError::Tls { host, source })?;
        trace.got_conn();
        send(TracedStream::new(tls, trace), request).await
    } else {
        trace.got_conn();
        send(TracedStream::new(tcp, trace), request).await
    }
}

fn build_request(url: &Url, user_agent: &str) -> Result<Request<Empty<Bytes>>, ProbeError> {
    Request::builder()
        .method(Method::GET)
        .uri(&url[Position::BeforePath..Position::AfterQuery])
        .header(HOST, &url[Position::BeforeHost..Position::AfterPort])
        .header(USER_AGENT, user_agent)
        .header(CONNECTION, "close")
        .body(Empty::<Bytes>::new())
        .map_err(ProbeError::Request)
}

/// Dial the addresses in order until one accepts. Each attempt is reported.
async fn connect(
    host: &str,
    addrs: &[SocketAddr],
    trace: &dyn ClientTrace,
) -> Result<TcpStream, ProbeError> {
    let mut last_error = None;

    for &addr in addrs {
        trace.connect_start(addr);
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                trace.connect_done(addr, None);
                return Ok(stream);
            }
            Err(err) => {
                trace.connect_done(addr, Some(&err.to_string()));
                last_error = Some((addr, err));
            }
        }
    }

    match last_error {
        Some((addr, source)) => Err(ProbeError::connect_failed(host, addr, source)),
        None => Err(ProbeError::NoAddress(host.to_string())),
    }
}

async fn send<T>(
    stream: TracedStream<T>,
    request: Request<Empty<Bytes>>,
) -> Result<StatusCode, ProbeError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(ProbeError::Http)?;

    tokio::spawn(async move {
        if let Err(err) = conn.await {
            log::debug!("connection closed with error: {err}");
        }
    });

    let response = sender.send_request(request).await.map_err(ProbeError::Http)?;
    Ok(response.status())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::net::IpAddr;
    use std::time::Duration;

    use hyper::Response;
    use hyper::service::service_fn;
    use rustls::pki_types::PrivateKeyDer;
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::app_config::AppConfig;
    use crate::config::model::FailurePolicy;

    fn client() -> ProbeClient {
        ProbeClient::from_config(&AppConfig {
            url: Url::parse("http://localhost/").expect("valid url"),
            json: false,
            debug: false,
            dns_hosts: Vec::<IpAddr>::new(),
            failure_policy: FailurePolicy::Abort,
            user_agent: "tripper-test".to_string(),
        })
        .expect("client")
    }

    /// Serve `200 OK` over TLS with a fresh self-signed certificate for
    /// `localhost`. Returns the port.
    async fn self_signed_https_server() -> u16 {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
                .expect("self-signed cert");
        let key = PrivateKeyDer::Pkcs8(key_pair.serialize_der().into());
        let config = rustls::ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::aws_lc_rs::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .expect("server config");
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    let Ok(tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    let service = service_fn(|_| async {
                        Ok::<_, Infallible>(Response::new(Empty::<Bytes>::new()))
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(tls), service)
                        .await;
                });
            }
        });

        port
    }

    #[test]
    fn test_build_request_targets_origin_form() {
        let url = Url::parse("http://example.com:8080/status?verbose=1").expect("valid url");
        let request = build_request(&url, "tripper-test").expect("request");

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri(), "/status?verbose=1");
        assert_eq!(request.headers()[HOST], "example.com:8080");
        assert_eq!(request.headers()[CONNECTION], "close");
        assert_eq!(request.headers()[USER_AGENT], "tripper-test");
    }

    #[test]
    fn test_invalid_header_is_a_request_error() {
        let url = Url::parse("http://example.com/").expect("valid url");
        let err = build_request(&url, "bad\nagent").expect_err("invalid header");
        assert!(err.is_request_error());
    }

    #[tokio::test]
    async fn test_probe_records_ordered_timeline() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/probe"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let port = mock_server.address().port();
        let url = Url::parse(&format!("http://localhost:{port}/probe")).expect("valid url");
        let recorder = Arc::new(TimelineRecorder::new());

        let status = probe_url(&client(), &url, recorder.clone())
            .await
            .expect("probe succeeds");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let timeline = recorder.snapshot();
        let dns_end = timeline.dns_end.expect("dns end");
        let connect_start = timeline.connect_start.expect("connect start");
        let connect_end = timeline.connect_end.expect("connect end");
        let acquired = timeline.connection_acquired_at.expect("connection acquired");
        let written = timeline.request_written_at.expect("request written");
        let first_byte = timeline.first_byte_at.expect("first byte");

        assert!(timeline.dns_start.expect("dns start") <= dns_end);
        assert!(dns_end <= connect_start);
        assert!(connect_start <= connect_end);
        assert!(connect_end <= acquired);
        assert!(acquired <= written);
        assert!(written <= first_byte);
        assert_eq!(timeline.ttfb_elapsed, first_byte - connect_start);
        assert!(timeline.clamped.is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection_keeps_partial_timeline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("valid url");
        let (tx, mut rx) = mpsc::channel(1);

        run_probe(Arc::new(client()), url, tx).await;

        let outcome = rx.recv().await.expect("outcome published");
        assert!(matches!(outcome.error, Some(ProbeError::Connect { .. })));
        assert!(outcome.timeline.connect_start.is_some());
        assert!(outcome.timeline.connect_end.is_some());
        assert!(outcome.timeline.first_byte_at.is_none());
    }

    #[tokio::test]
    async fn test_https_with_untrusted_cert_records_tls_phase() {
        let port = self_signed_https_server().await;
        let url = Url::parse(&format!("https://localhost:{port}/")).expect("valid url");
        let recorder = Arc::new(TimelineRecorder::new());

        let status = probe_url(&client(), &url, recorder.clone()).await;
        assert_eq!(status.expect("probe succeeds"), StatusCode::OK);

        let timeline = recorder.snapshot();
        let connect_end = timeline.connect_end.expect("connect end");
        let acquired = timeline.connection_acquired_at.expect("connection acquired");
        let written = timeline.request_written_at.expect("request written");

        assert!(timeline.connection_elapsed > Duration::ZERO);
        assert!(connect_end <= acquired);
        assert!(acquired <= written);
        assert!(timeline.first_byte_at.is_some());
        assert!(timeline.clamped.is_empty());
    }
}
