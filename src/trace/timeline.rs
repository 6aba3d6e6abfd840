use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;

use super::ClientTrace;

/// A measured span of a request, named by the event pair that bounds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// dns start → dns done
    Dns,
    /// connect start → connect done
    Connect,
    /// connect done → connection acquired (TLS handshake, connection setup)
    Connection,
    /// connect start → first response byte
    Ttfb,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Dns => "dns",
            Phase::Connect => "connect",
            Phase::Connection => "connection",
            Phase::Ttfb => "ttfb",
        };
        f.write_str(name)
    }
}

/// Timestamped lifecycle events of one request and the durations derived from them.
///
/// Elapsed values are computed when the closing event arrives. An end event
/// without a start, or one that lands before its start, yields a zero
/// duration and the phase is listed in `clamped`.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub host: Option<String>,

    pub dns_start: Option<Instant>,
    pub dns_end: Option<Instant>,
    pub dns_elapsed: Duration,
    pub dns_addresses: Vec<IpAddr>,
    pub dns_error: Option<String>,

    pub connect_start: Option<Instant>,
    pub connect_end: Option<Instant>,
    pub connect_elapsed: Duration,

    pub connection_acquired_at: Option<Instant>,
    pub connection_elapsed: Duration,

    pub headers_written_at: Option<Instant>,
    pub request_written_at: Option<Instant>,

    pub first_byte_at: Option<Instant>,
    pub ttfb_elapsed: Duration,

    pub clamped: Vec<Phase>,
}

impl Timeline {
    pub fn on_dns_start(&mut self, at: Instant, host: &str) {
        self.dns_start = Some(at);
        self.host = Some(host.to_string());
    }

    pub fn on_dns_done(&mut self, at: Instant, addrs: &[IpAddr], err: Option<&str>) {
        self.dns_end = Some(at);
        self.dns_elapsed = self.elapsed_since(Phase::Dns, self.dns_start, at);
        self.dns_addresses = addrs.to_vec();
        self.dns_error = err.map(str::to_string);
    }

    pub fn on_connect_start(&mut self, at: Instant) {
        self.connect_start = Some(at);
    }

    pub fn on_connect_done(&mut self, at: Instant) {
        self.connect_end = Some(at);
        self.connect_elapsed = self.elapsed_since(Phase::Connect, self.connect_start, at);
    }

    pub fn on_got_conn(&mut self, at: Instant) {
        self.connection_acquired_at = Some(at);
        self.connection_elapsed = self.elapsed_since(Phase::Connection, self.connect_end, at);
    }

    pub fn on_wrote_headers(&mut self, at: Instant) {
        self.headers_written_at = Some(at);
    }

    pub fn on_wrote_request(&mut self, at: Instant) {
        self.request_written_at = Some(at);
    }

    pub fn on_first_response_byte(&mut self, at: Instant) {
        self.first_byte_at = Some(at);
        self.ttfb_elapsed = self.elapsed_since(Phase::Ttfb, self.connect_start, at);
    }

    /// Duration from `start` to `end`, clamped to zero when the pair is out of order.
    fn elapsed_since(&mut self, phase: Phase, start: Option<Instant>, end: Instant) -> Duration {
        match start.and_then(|start| end.checked_duration_since(start)) {
            Some(elapsed) => elapsed,
            None => {
                log::warn!("{phase} end event arrived before its start, clamping to zero");
                if !self.clamped.contains(&phase) {
                    self.clamped.push(phase);
                }
                Duration::ZERO
            }
        }
    }
}

/// `ClientTrace` observer that fills a `Timeline` for exactly one request.
#[derive(Debug, Default)]
pub struct TimelineRecorder {
    timeline: Mutex<Timeline>,
}

impl TimelineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    pub fn snapshot(&self) -> Timeline {
        self.timeline.lock().clone()
    }
}

impl ClientTrace for TimelineRecorder {
    fn dns_start(&self, host: &str) {
        log::debug!("{} dns start {host}", Utc::now());
        self.timeline.lock().on_dns_start(Instant::now(), host);
    }

    fn dns_done(&self, addrs: &[IpAddr], err: Option<&str>) {
        let at = Instant::now();
        log::debug!("{} dns end {addrs:?}", Utc::now());
        self.timeline.lock().on_dns_done(at, addrs, err);
    }

    fn connect_start(&self, addr: SocketAddr) {
        log::debug!("{} dial start {addr}", Utc::now());
        self.timeline.lock().on_connect_start(Instant::now());
    }

    fn connect_done(&self, addr: SocketAddr, err: Option<&str>) {
        let at = Instant::now();
        match err {
            Some(err) => log::debug!("{} dial end {addr}: {err}", Utc::now()),
            None => log::debug!("{} dial end {addr}", Utc::now()),
        }
        self.timeline.lock().on_connect_done(at);
    }

    fn got_conn(&self) {
        let at = Instant::now();
        log::debug!("{} conn time", Utc::now());
        self.timeline.lock().on_got_conn(at);
    }

    fn wrote_headers(&self) {
        let at = Instant::now();
        log::debug!("{} wrote all request headers", Utc::now());
        self.timeline.lock().on_wrote_headers(at);
    }

    fn wrote_request(&self) {
        let at = Instant::now();
        log::debug!("{} wrote all request", Utc::now());
        self.timeline.lock().on_wrote_request(at);
    }

    fn got_first_response_byte(&self) {
        let at = Instant::now();
        log::debug!("{} first received response byte", Utc::now());
        self.timeline.lock().on_first_response_byte(at);
    }
}
