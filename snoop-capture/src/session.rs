//! Capture session lifecycle and dispatch loop

use snoop_core::status::{PCAP_ERROR_BREAK, PCAP_SUCCESS};
use snoop_core::{classify, Classification, Error, Result, SessionState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::facility::{CaptureFacility, CaptureHandle, NextFrame};
use crate::handler::{Flow, PacketHandler};
use crate::policy::ErrorPolicy;

/// Default snapshot length (maximum bytes per packet)
const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout (milliseconds)
const DEFAULT_TIMEOUT_MS: i32 = 1000;

/// Configuration applied to a capture before activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Capture all frames regardless of destination address
    pub promiscuous: bool,
    /// Capture at the radio layer without associating to a network
    pub monitor_mode: bool,
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout in milliseconds; bounds how long a stop request waits
    pub timeout_ms: i32,
    /// Deliver packets as soon as they arrive
    pub immediate_mode: bool,
    /// Kernel buffer size (0 = facility default)
    pub buffer_size: i32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            promiscuous: true,
            monitor_mode: true,
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            immediate_mode: true,
            buffer_size: 0,
        }
    }
}

impl CaptureOptions {
    pub fn with_promiscuous(mut self, enable: bool) -> Self {
        self.promiscuous = enable;
        self
    }

    pub fn with_monitor_mode(mut self, enable: bool) -> Self {
        self.monitor_mode = enable;
        self
    }

    pub fn with_snaplen(mut self, snaplen: i32) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: i32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Cancellation token for a running capture loop.
///
/// Clones share the flag and can be moved to other threads or a signal
/// handler. The loop checks it before pulling each frame.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to return before its budget is used up
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Why a capture loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of packets was delivered
    BudgetExhausted,
    /// The handler returned [`Flow::Break`]
    HandlerBreak,
    /// The stop handle was raised or the facility loop was broken
    StopRequested,
    /// The source ran out of frames
    SourceExhausted,
}

/// Summary of one capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Frames handed to the handler
    pub delivered: u64,
    pub reason: StopReason,
}

/// One capture handle on one device, driven through its lifecycle.
///
/// The session owns the handle exclusively and releases it exactly once:
/// on [`close`](CaptureSession::close), when a facility call fails, or on drop.
pub struct CaptureSession<H: CaptureHandle> {
    device: String,
    handle: Option<H>,
    state: SessionState,
    policy: ErrorPolicy,
    stop: StopHandle,
    failure: Option<Error>,
}

impl<H: CaptureHandle> CaptureSession<H> {
    /// Open a capture handle on `device`
    pub fn open<F>(facility: &F, device: &str) -> Result<Self>
    where
        F: CaptureFacility<Handle = H>,
    {
        info!("Opening {}", device);

        let handle = facility.open(device).map_err(|detail| Error::Open {
            device: device.to_string(),
            detail,
        })?;

        Ok(Self {
            device: device.to_string(),
            handle: Some(handle),
            state: SessionState::Created,
            policy: ErrorPolicy::default(),
            stop: StopHandle::new(),
            failure: None,
        })
    }

    /// Replace the error policy (default: every non-zero status is fatal)
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share an existing stop token, e.g. one wired to a signal handler
    /// before the session was opened
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The error that moved the session to [`SessionState::Failed`]
    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            SessionState::Activated | SessionState::Capturing
        )
    }

    /// Token that interrupts [`run`](CaptureSession::run) from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Apply capture options. Only valid before activation.
    pub fn configure(&mut self, options: &CaptureOptions) -> Result<()> {
        self.ensure_configurable("configure")?;

        self.apply("promisc mode", |h| h.set_promiscuous(options.promiscuous))?;
        self.apply("monitor mode", |h| h.set_monitor_mode(options.monitor_mode))?;
        self.apply("snapshot length", |h| h.set_snaplen(options.snaplen))?;
        self.apply("read timeout", |h| h.set_timeout(options.timeout_ms))?;
        self.apply("immediate mode", |h| h.set_immediate_mode(options.immediate_mode))?;
        self.apply("buffer size", |h| h.set_buffer_size(options.buffer_size))?;

        self.state = SessionState::Configured;
        debug!(
            "Configured {}: promiscuous={}, monitor={}, snaplen={}, timeout={}ms",
            self.device, options.promiscuous, options.monitor_mode, options.snaplen, options.timeout_ms
        );
        Ok(())
    }

    /// Commit the configuration. Irreversible.
    pub fn activate(&mut self) -> Result<()> {
        self.ensure_configurable("activate")?;

        let code = self.with_handle("activate", |h| h.activate())?;
        self.check(code, "activation", |device, classification| Error::Activate {
            device,
            classification,
        })?;

        self.state = SessionState::Activated;
        info!("Capture activated on {}", self.device);
        Ok(())
    }

    /// Deliver up to `max_packets` frames to `handler`, blocking until done.
    ///
    /// Returns early when the handler breaks, the stop handle is raised, or
    /// the source runs dry. A non-positive budget is rejected.
    pub fn run<P: PacketHandler>(&mut self, max_packets: i32, mut handler: P) -> Result<RunOutcome> {
        if self.state != SessionState::Activated {
            return Err(Error::InvalidState {
                operation: "run",
                state: self.state,
            });
        }

        if max_packets <= 0 {
            return Err(Error::InvalidArgument {
                name: "max_packets".to_string(),
                reason: format!("packet budget must be positive, got {}", max_packets),
            });
        }

        info!(
            "Capturing {} packets (please wait, filling buffer....)",
            max_packets
        );

        self.state = SessionState::Capturing;
        let result = self.dispatch(max_packets as u64, &mut handler);
        self.stop.clear();

        match result {
            Ok(outcome) => {
                self.state = SessionState::Activated;
                debug!(
                    "Loop on {} delivered {} packets ({:?})",
                    self.device, outcome.delivered, outcome.reason
                );
                info!("Capture complete");
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Release the handle. Safe to call repeatedly and from any state; a
    /// failed session stays failed so its error remains inspectable.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle);
            debug!("Released capture handle on {}", self.device);
        }

        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
    }

    fn dispatch<P: PacketHandler>(&mut self, budget: u64, handler: &mut P) -> Result<RunOutcome> {
        let stop = &self.stop;
        let Some(handle) = self.handle.as_mut() else {
            return Err(Error::InvalidState {
                operation: "run",
                state: self.state,
            });
        };

        let mut delivered = 0u64;
        while delivered < budget {
            if stop.is_stopped() {
                return Ok(RunOutcome {
                    delivered,
                    reason: StopReason::StopRequested,
                });
            }

            match handle.next_frame() {
                NextFrame::Frame(frame) => {
                    delivered += 1;
                    if handler.on_packet(&frame) == Flow::Break {
                        return Ok(RunOutcome {
                            delivered,
                            reason: StopReason::HandlerBreak,
                        });
                    }
                }
                NextFrame::Idle => continue,
                NextFrame::Exhausted => {
                    return Ok(RunOutcome {
                        delivered,
                        reason: StopReason::SourceExhausted,
                    });
                }
                NextFrame::Failed(PCAP_ERROR_BREAK) => {
                    return Ok(RunOutcome {
                        delivered,
                        reason: StopReason::StopRequested,
                    });
                }
                NextFrame::Failed(code) => {
                    return Err(Error::Dispatch {
                        device: self.device.clone(),
                        classification: classify(code),
                    });
                }
            }
        }

        Ok(RunOutcome {
            delivered,
            reason: StopReason::BudgetExhausted,
        })
    }

    fn ensure_configurable(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SessionState::Created | SessionState::Configured => Ok(()),
            SessionState::Activated | SessionState::Capturing => Err(Error::AlreadyActivated),
            state => Err(Error::InvalidState { operation, state }),
        }
    }

    fn with_handle<F>(&mut self, operation: &'static str, call: F) -> Result<i32>
    where
        F: FnOnce(&mut H) -> i32,
    {
        match self.handle.as_mut() {
            Some(handle) => Ok(call(handle)),
            None => Err(Error::InvalidState {
                operation,
                state: self.state,
            }),
        }
    }

    fn apply<F>(&mut self, option: &'static str, call: F) -> Result<()>
    where
        F: FnOnce(&mut H) -> i32,
    {
        let code = self.with_handle("configure", call)?;
        self.check(code, option, |device, classification| Error::Configure {
            device,
            option,
            classification,
        })
    }

    /// Classify a status and decide whether it ends the session
    fn check<E>(&mut self, code: i32, context: &str, to_error: E) -> Result<()>
    where
        E: FnOnce(String, Classification) -> Error,
    {
        if code == PCAP_SUCCESS {
            return Ok(());
        }

        let classification = classify(code);
        if !self.policy.is_fatal(&classification) {
            warn!("{} on {}: {}", context, self.device, classification);
            return Ok(());
        }

        let error = to_error(self.device.clone(), classification);
        Err(self.fail(error))
    }

    fn fail(&mut self, error: Error) -> Error {
        debug!("Session on {} failed: {}", self.device, error);
        self.handle = None;
        self.state = SessionState::Failed;
        self.failure = Some(error.clone());
        error
    }
}

impl<H: CaptureHandle> Drop for CaptureSession<H> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::Analyser;
    use crate::facility::{MemoryFacility, MemoryHandle, Operation, ScriptEnd};
    use crate::policy::WarningPolicy;
    use snoop_core::status::{
        StatusCode, PCAP_ERROR, PCAP_ERROR_PERM_DENIED, PCAP_WARNING_PROMISC_NOTSUP,
    };
    use snoop_core::Frame;
    use std::thread;
    use std::time::Duration;

    fn frames(count: usize) -> Vec<Vec<u8>> {
        (0..count).map(|i| vec![(i % 256) as u8; 64]).collect()
    }

    fn options() -> CaptureOptions {
        CaptureOptions::default().with_timeout(1)
    }

    fn activated(facility: &MemoryFacility, device: &str) -> CaptureSession<MemoryHandle> {
        let mut session = CaptureSession::open(facility, device).unwrap();
        session.configure(&options()).unwrap();
        session.activate().unwrap();
        session
    }

    #[test]
    fn test_capture_options_default() {
        let options = CaptureOptions::default();
        assert!(options.promiscuous);
        assert!(options.monitor_mode);
        assert_eq!(options.snaplen, DEFAULT_SNAPLEN);
        assert_eq!(options.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(options.immediate_mode);
        assert_eq!(options.buffer_size, 0);
    }

    #[test]
    fn test_capture_lifecycle() {
        let facility = MemoryFacility::new().with_device("lo0", frames(5));
        let analyser = Analyser::new();

        let mut session = CaptureSession::open(&facility, "lo0").unwrap();
        assert_eq!(session.state(), SessionState::Created);
        assert_eq!(session.device(), "lo0");

        session.configure(&options()).unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert!(session.handle.as_ref().unwrap().is_promiscuous());
        assert!(session.handle.as_ref().unwrap().is_monitor_mode());

        session.activate().unwrap();
        assert_eq!(session.state(), SessionState::Activated);
        assert!(session.is_active());

        let outcome = session.run(5, analyser.clone()).unwrap();
        assert_eq!(outcome.delivered, 5);
        assert_eq!(outcome.reason, StopReason::BudgetExhausted);
        assert_eq!(analyser.current_count(), 5);
        assert_eq!(session.state(), SessionState::Activated);

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(facility.releases("lo0"), 1);
    }

    #[test]
    fn test_run_invokes_handler_exactly_n_times() {
        let facility = MemoryFacility::new().with_device("eth0", frames(10));
        let mut session = activated(&facility, "eth0");
        let analyser = Analyser::new();
        analyser.on_packet(&Frame::new(snoop_core::PacketMeta::new(0), &[]));
        let before = analyser.current_count();

        let mut seen = Vec::new();
        let outcome = session
            .run(3, |frame: &Frame<'_>| {
                seen.push(frame.payload()[0]);
                analyser.on_packet(frame);
                Flow::Continue
            })
            .unwrap();

        assert_eq!(outcome.delivered, 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(analyser.current_count(), before + 3);

        // A second loop picks up where the first stopped
        let mut seen = Vec::new();
        session
            .run(2, |frame: &Frame<'_>| {
                seen.push(frame.payload()[0]);
                Flow::Continue
            })
            .unwrap();
        assert_eq!(seen, vec![3, 4]);
    }

    #[test]
    fn test_open_nonexistent_device() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        match CaptureSession::open(&facility, "en9") {
            Err(Error::Open { device, detail }) => {
                assert_eq!(device, "en9");
                assert!(detail.contains(StatusCode::NoSuchDevice.description()));
            }
            Err(e) => panic!("Expected Open error, got {}", e),
            Ok(_) => panic!("Expected Open error, got a session"),
        }
        assert_eq!(facility.releases("en9"), 0);
    }

    #[test]
    fn test_configure_after_activate() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        let mut session = activated(&facility, "lo0");

        assert_eq!(session.configure(&options()), Err(Error::AlreadyActivated));
        assert_eq!(session.activate(), Err(Error::AlreadyActivated));
        assert_eq!(session.state(), SessionState::Activated);

        // Ordering mistakes leave the session usable
        assert_eq!(session.run(1, Analyser::new()).unwrap().delivered, 1);
    }

    #[test]
    fn test_activate_without_configure() {
        let facility = MemoryFacility::new().with_device("lo0", frames(2));
        let mut session = CaptureSession::open(&facility, "lo0").unwrap();
        session.activate().unwrap();
        assert_eq!(session.run(2, Analyser::new()).unwrap().delivered, 2);
    }

    #[test]
    fn test_run_requires_activation() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        let mut session = CaptureSession::open(&facility, "lo0").unwrap();

        assert_eq!(
            session.run(1, Analyser::new()),
            Err(Error::InvalidState {
                operation: "run",
                state: SessionState::Created,
            })
        );

        session.configure(&options()).unwrap();
        assert!(matches!(
            session.run(1, Analyser::new()),
            Err(Error::InvalidState {
                state: SessionState::Configured,
                ..
            })
        ));
    }

    #[test]
    fn test_run_rejects_non_positive_budget() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        let mut session = activated(&facility, "lo0");

        for budget in [0, -1, i32::MIN] {
            match session.run(budget, Analyser::new()) {
                Err(Error::InvalidArgument { name, .. }) => assert_eq!(name, "max_packets"),
                other => panic!("Expected InvalidArgument, got {:?}", other),
            }
        }
        assert_eq!(session.state(), SessionState::Activated);
    }

    #[test]
    fn test_close_is_idempotent() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        let mut session = activated(&facility, "lo0");

        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(facility.releases("lo0"), 1);

        assert!(matches!(
            session.run(1, Analyser::new()),
            Err(Error::InvalidState {
                state: SessionState::Closed,
                ..
            })
        ));
        assert!(matches!(
            session.configure(&options()),
            Err(Error::InvalidState {
                state: SessionState::Closed,
                ..
            })
        ));

        drop(session);
        assert_eq!(facility.releases("lo0"), 1);
    }

    #[test]
    fn test_close_from_created() {
        let facility = MemoryFacility::new().with_device("lo0", Vec::new());
        let mut session = CaptureSession::open(&facility, "lo0").unwrap();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(facility.releases("lo0"), 1);
    }

    #[test]
    fn test_drop_releases_handle() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        {
            let _session = activated(&facility, "lo0");
        }
        assert_eq!(facility.releases("lo0"), 1);
    }

    #[test]
    fn test_configure_failure_is_terminal() {
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(1))
            .with_status("eth0", Operation::Promiscuous, PCAP_ERROR_PERM_DENIED);
        let mut session = CaptureSession::open(&facility, "eth0").unwrap();

        let err = session.configure(&options()).unwrap_err();
        match &err {
            Error::Configure {
                device,
                option,
                classification,
            } => {
                assert_eq!(device, "eth0");
                assert_eq!(*option, "promisc mode");
                assert_eq!(classification.code(), PCAP_ERROR_PERM_DENIED);
            }
            other => panic!("Expected Configure error, got {:?}", other),
        }

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.failure(), Some(&err));
        assert_eq!(facility.releases("eth0"), 1);

        assert!(matches!(
            session.activate(),
            Err(Error::InvalidState {
                state: SessionState::Failed,
                ..
            })
        ));

        session.close();
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(facility.releases("eth0"), 1);
    }

    #[test]
    fn test_monitor_mode_failure_names_option() {
        let facility = MemoryFacility::new()
            .with_device("en0", frames(1))
            .with_status("en0", Operation::MonitorMode, StatusCode::RfmonNotSupported.code());
        let mut session = CaptureSession::open(&facility, "en0").unwrap();

        let err = session.configure(&options()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Couldn't set monitor mode on 'en0': this device doesn't support rfmon (monitor) mode (-6)"
        );
    }

    #[test]
    fn test_activate_failure() {
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(1))
            .with_status("eth0", Operation::Activate, StatusCode::IfaceNotUp.code());
        let mut session = CaptureSession::open(&facility, "eth0").unwrap();
        session.configure(&options()).unwrap();

        let err = session.activate().unwrap_err();
        assert_eq!(
            err,
            Error::Activate {
                device: "eth0".to_string(),
                classification: classify(StatusCode::IfaceNotUp.code()),
            }
        );
        assert_eq!(err.device(), Some("eth0"));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!session.is_active());
    }

    #[test]
    fn test_warnings_fatal_by_default() {
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(1))
            .with_status("eth0", Operation::Promiscuous, PCAP_WARNING_PROMISC_NOTSUP);
        let mut session = CaptureSession::open(&facility, "eth0").unwrap();

        let err = session.configure(&options()).unwrap_err();
        assert!(err.is_warning());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_warnings_downgraded_by_policy() {
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(2))
            .with_status("eth0", Operation::Promiscuous, PCAP_WARNING_PROMISC_NOTSUP)
            .with_status("eth0", Operation::Activate, StatusCode::TstampTypeNotSupported.code());
        let policy = ErrorPolicy::recoverable().with_warnings(WarningPolicy::Downgrade);
        let mut session = CaptureSession::open(&facility, "eth0")
            .unwrap()
            .with_policy(policy);

        session.configure(&options()).unwrap();
        session.activate().unwrap();
        assert_eq!(session.state(), SessionState::Activated);
        assert_eq!(session.run(2, Analyser::new()).unwrap().delivered, 2);
    }

    #[test]
    fn test_downgrade_keeps_hard_errors_fatal() {
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(1))
            .with_status("eth0", Operation::Activate, PCAP_ERROR_PERM_DENIED);
        let policy = ErrorPolicy::recoverable().with_warnings(WarningPolicy::Downgrade);
        let mut session = CaptureSession::open(&facility, "eth0")
            .unwrap()
            .with_policy(policy);

        assert!(session.activate().is_err());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_handler_break() {
        let facility = MemoryFacility::new().with_device("lo0", frames(10));
        let mut session = activated(&facility, "lo0");

        let mut calls = 0;
        let outcome = session
            .run(10, |_: &Frame<'_>| {
                calls += 1;
                if calls == 2 {
                    Flow::Break
                } else {
                    Flow::Continue
                }
            })
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.reason, StopReason::HandlerBreak);
        assert_eq!(session.state(), SessionState::Activated);
    }

    #[test]
    fn test_stop_handle_interrupts_stalled_loop() {
        let facility = MemoryFacility::new().with_device("lo0", frames(3));
        let mut session = activated(&facility, "lo0");
        let analyser = Analyser::new();

        let stop = session.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.stop();
        });

        let outcome = session.run(100, analyser.clone()).unwrap();
        stopper.join().unwrap();

        assert_eq!(outcome.reason, StopReason::StopRequested);
        assert_eq!(outcome.delivered, 3);
        assert_eq!(analyser.current_count(), 3);
        assert!(!session.stop_handle().is_stopped());
    }

    #[test]
    fn test_source_exhausted() {
        let facility = MemoryFacility::new()
            .with_device("lo0", frames(2))
            .with_end("lo0", ScriptEnd::Exhausted);
        let mut session = activated(&facility, "lo0");

        let outcome = session.run(5, Analyser::new()).unwrap();
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.reason, StopReason::SourceExhausted);
    }

    #[test]
    fn test_facility_break_stops_loop() {
        let facility = MemoryFacility::new()
            .with_device("lo0", frames(1))
            .with_end("lo0", ScriptEnd::Fail(PCAP_ERROR_BREAK));
        let mut session = activated(&facility, "lo0");

        let outcome = session.run(5, Analyser::new()).unwrap();
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.reason, StopReason::StopRequested);
        assert_eq!(session.state(), SessionState::Activated);
    }

    #[test]
    fn test_dispatch_failure() {
        let facility = MemoryFacility::new()
            .with_device("lo0", frames(1))
            .with_end("lo0", ScriptEnd::Fail(PCAP_ERROR));
        let mut session = activated(&facility, "lo0");

        let err = session.run(5, Analyser::new()).unwrap_err();
        assert_eq!(
            err,
            Error::Dispatch {
                device: "lo0".to_string(),
                classification: classify(PCAP_ERROR),
            }
        );
        assert_eq!(err.to_string(), "Capture loop on 'lo0' failed: unknown error (-1)");
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(facility.releases("lo0"), 1);
    }

    #[test]
    fn test_parallel_sessions_share_analyser() {
        const BUDGET: i32 = 500;
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(BUDGET as usize))
            .with_device("eth1", frames(BUDGET as usize));
        let analyser = Analyser::new();

        let workers: Vec<_> = ["eth0", "eth1"]
            .into_iter()
            .map(|device| {
                let facility = facility.clone();
                let analyser = analyser.clone();
                thread::spawn(move || {
                    let mut session = activated(&facility, device);
                    let mut calls = 0;
                    let outcome = session
                        .run(BUDGET, |frame: &Frame<'_>| {
                            calls += 1;
                            analyser.on_packet(frame);
                            Flow::Continue
                        })
                        .unwrap();
                    assert_eq!(outcome.delivered, BUDGET as u64);
                    calls
                })
            })
            .collect();

        for worker in workers {
            assert_eq!(worker.join().unwrap(), BUDGET);
        }

        assert_eq!(analyser.current_count(), 2 * BUDGET as u64);
        assert_eq!(facility.releases("eth0"), 1);
        assert_eq!(facility.releases("eth1"), 1);
    }
}
