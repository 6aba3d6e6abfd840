pub mod timeline;

use std::net::{IpAddr, SocketAddr};

/// Lifecycle notification points of a single traced HTTP request.
///
/// The probe invokes these synchronously, in request order, while it drives
/// one request. Every method has an empty default so an observer only
/// implements the events it cares about.
pub trait ClientTrace: Send + Sync {
    /// Name resolution is about to start for `host`.
    fn dns_start(&self, _host: &str) {}

    /// Name resolution finished, with the addresses found and the error (if any).
    fn dns_done(&self, _addrs: &[IpAddr], _err: Option<&str>) {}

    /// A dial to `addr` is about to start.
    fn connect_start(&self, _addr: SocketAddr) {}

    /// The dial to `addr` finished. `err` is set when it failed.
    fn connect_done(&self, _addr: SocketAddr, _err: Option<&str>) {}

    /// A usable connection (after TLS, for https) is available.
    fn got_conn(&self) {}

    fn wrote_headers(&self) {}

    fn wrote_request(&self) {}

    fn got_first_response_byte(&self) {}
}

pub mod prelude {
    pub use super::ClientTrace;
    pub use super::timeline::{Phase, Timeline, TimelineRecorder};
}
