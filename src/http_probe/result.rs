use crate::trace::prelude::Timeline;

use super::error::ProbeError;

/// What a probe worker publishes: the timeline captured so far and the error
/// that ended the probe early, if any.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub timeline: Timeline,
    pub error: Option<ProbeError>,
}
