//! One capture run, from open to close

use snoop_capture::{
    Analyser, CaptureFacility, CaptureOptions, CaptureSession, ErrorPolicy, RunOutcome, StopHandle,
};
use snoop_core::Result;

/// Everything needed to run one capture
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub device: String,
    pub count: i32,
    pub options: CaptureOptions,
    pub policy: ErrorPolicy,
}

/// Open, configure, activate and run a capture that counts into `analyser`.
///
/// The session is closed on every path, including early errors.
pub fn capture<F: CaptureFacility>(
    facility: &F,
    request: &CaptureRequest,
    analyser: &Analyser,
    stop: StopHandle,
) -> Result<RunOutcome> {
    let mut session = CaptureSession::open(facility, &request.device)?
        .with_policy(request.policy)
        .with_stop_handle(stop);

    session.configure(&request.options)?;
    session.activate()?;
    let outcome = session.run(request.count, analyser.clone())?;
    session.close();

    Ok(outcome)
}
