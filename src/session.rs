//! The bounded scan loop
//!
//! A session opens its source, then alternates frame reads and resolver calls
//! until it finds a valid barcode or hits a guard (cancel, timeout, attempt
//! bound). Every terminal path goes through the same [`OpenSource`] guard, so
//! the source is closed exactly once however the loop ends.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::ScanConfig;
use crate::decoder::{BuiltinDecoder, SymbologyDecoder};
use crate::error::ReadError;
use crate::models::{Barcode, BoundingBox, Frame, RegionOfInterest, Stage, SymbologySet};
use crate::resolver::MultiStrategyResolver;
use crate::source::{FrameSource, OpenSource};
use crate::validator::validate_hit;

/// Pause before polling again a source that had no frame ready
const NO_FRAME_BACKOFF: Duration = Duration::from_millis(2);

/// Where a session is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// Not started, or a still image that never decoded
    Idle,
    /// Inside the read and decode loop
    Scanning,
    /// A validated barcode was read
    Found,
    /// The timeout elapsed first
    TimedOut,
    /// Attempt bound reached or source ran dry
    AttemptsExhausted,
    /// A [`CancelToken`] fired
    Cancelled,
    /// The source failed to open
    DeviceError,
}

impl ScanState {
    /// Anything but `Idle` and `Scanning`
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScanState::Idle | ScanState::Scanning)
    }
}

/// Why a scan ended without a barcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The timeout elapsed
    Timeout,
    /// No valid barcode within the attempt bound
    AttemptsExhausted,
    /// A [`CancelToken`] fired
    Cancelled,
    /// The frame source could not be opened
    DeviceError,
    /// Still-image bytes that are not a decodable container
    InvalidImage,
}

impl StopReason {
    /// Kebab-case reason code
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Timeout => "timeout",
            StopReason::AttemptsExhausted => "attempts-exhausted",
            StopReason::Cancelled => "cancelled",
            StopReason::DeviceError => "device-error",
            StopReason::InvalidImage => "invalid-image",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation flag, observed between loop iterations
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every session holding a clone to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`CancelToken::cancel`] was called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Terminal outcome of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Terminal state
    pub state: ScanState,
    /// The validated barcode, if found
    pub barcode: Option<Barcode>,
    /// Set whenever `barcode` is `None`
    pub reason: Option<StopReason>,
    /// Loop iterations that reached the resolver
    pub attempts: u32,
    /// Time from start to the terminal state
    pub elapsed: Duration,
    /// Preprocessing stage of the winning candidate
    pub stage: Option<Stage>,
    /// Where the barcode sits in the captured frame, when the decoder knows
    pub bounding_box: Option<BoundingBox>,
    /// Error text behind a `device-error` or `invalid-image` reason
    pub detail: Option<String>,
}

impl ScanReport {
    /// A still image that never made it to a frame
    pub fn invalid_image(detail: impl Into<String>) -> Self {
        Self {
            state: ScanState::Idle,
            barcode: None,
            reason: Some(StopReason::InvalidImage),
            attempts: 0,
            elapsed: Duration::ZERO,
            stage: None,
            bounding_box: None,
            detail: Some(detail.into()),
        }
    }

    /// Whether a barcode was found
    pub fn is_found(&self) -> bool {
        self.barcode.is_some()
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.barcode, self.reason) {
            (Some(barcode), _) => write!(f, "found {barcode}"),
            (None, Some(reason)) => write!(f, "not found: {reason}"),
            (None, None) => f.write_str("not found"),
        }
    }
}

enum Outcome {
    Found {
        barcode: Barcode,
        stage: Stage,
        bounding_box: Option<BoundingBox>,
    },
    Stopped(ScanState, StopReason, Option<String>),
}

/// One end-to-end scan over a frame source
pub struct ScanSession<S: FrameSource, D: SymbologyDecoder = BuiltinDecoder> {
    source: S,
    resolver: MultiStrategyResolver<D>,
    symbologies: SymbologySet,
    region_of_interest: Option<RegionOfInterest>,
    cancel: CancelToken,
    state: ScanState,
    attempts_used: u32,
    last_frame: Option<Frame>,
    result: Option<Barcode>,
}

impl<S: FrameSource> ScanSession<S, BuiltinDecoder> {
    /// Session over `source` with the builtin decoders
    pub fn new(source: S, config: &ScanConfig) -> Self {
        Self::with_resolver(source, MultiStrategyResolver::builtin(config), config)
    }
}

impl<S: FrameSource, D: SymbologyDecoder> ScanSession<S, D> {
    /// Session over `source` with a custom resolver
    pub fn with_resolver(source: S, resolver: MultiStrategyResolver<D>, config: &ScanConfig) -> Self {
        Self {
            source,
            resolver,
            symbologies: config.symbologies,
            region_of_interest: config.region_of_interest,
            cancel: CancelToken::new(),
            state: ScanState::Idle,
            attempts_used: 0,
            last_frame: None,
            result: None,
        }
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Clone of the token that cancels this session
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current state
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Frames that reached the resolver so far
    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    /// Last frame captured, kept for diagnostics
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Barcode of the last scan, if it was found
    pub fn result(&self) -> Option<&Barcode> {
        self.result.as_ref()
    }

    /// The resolver this session decodes with
    pub fn resolver(&self) -> &MultiStrategyResolver<D> {
        &self.resolver
    }

    /// The owned frame source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Give the source back, e.g. to inspect a test double
    pub fn into_source(self) -> S {
        self.source
    }

    /// Scan with the limits from `config`
    pub fn run(&mut self, config: &ScanConfig) -> ScanReport {
        self.start(config.timeout(), config.max_attempts)
    }

    /// Run the loop to a terminal state
    ///
    /// `max_attempts: None` means only the timeout bounds the scan. Calling
    /// this again after a terminal state starts a fresh scan.
    pub fn start(&mut self, timeout: Duration, max_attempts: Option<u32>) -> ScanReport {
        let started = Instant::now();
        self.state = ScanState::Scanning;
        self.attempts_used = 0;
        self.result = None;
        info!(?timeout, ?max_attempts, symbologies = ?self.symbologies, "scan started");

        let outcome = self.drive(started, timeout, max_attempts);
        let elapsed = started.elapsed();

        let report = match outcome {
            Outcome::Found {
                barcode,
                stage,
                bounding_box,
            } => {
                self.state = ScanState::Found;
                self.result = Some(barcode.clone());
                ScanReport {
                    state: ScanState::Found,
                    barcode: Some(barcode),
                    reason: None,
                    attempts: self.attempts_used,
                    elapsed,
                    stage: Some(stage),
                    bounding_box,
                    detail: None,
                }
            }
            Outcome::Stopped(state, reason, detail) => {
                self.state = state;
                ScanReport {
                    state,
                    barcode: None,
                    reason: Some(reason),
                    attempts: self.attempts_used,
                    elapsed,
                    stage: None,
                    bounding_box: None,
                    detail,
                }
            }
        };

        info!(
            state = ?report.state,
            reason = report.reason.map(StopReason::as_str),
            attempts = report.attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "scan finished"
        );
        report
    }

    fn drive(&mut self, started: Instant, timeout: Duration, max_attempts: Option<u32>) -> Outcome {
        let mut source = match OpenSource::open(&mut self.source) {
            Ok(source) => source,
            Err(err) => {
                warn!(%err, "frame source failed to open");
                return Outcome::Stopped(
                    ScanState::DeviceError,
                    StopReason::DeviceError,
                    Some(err.to_string()),
                );
            }
        };

        loop {
            if self.cancel.is_cancelled() {
                return Outcome::Stopped(ScanState::Cancelled, StopReason::Cancelled, None);
            }
            if started.elapsed() >= timeout {
                return Outcome::Stopped(ScanState::TimedOut, StopReason::Timeout, None);
            }
            if max_attempts.is_some_and(|max| self.attempts_used >= max) {
                return Outcome::Stopped(
                    ScanState::AttemptsExhausted,
                    StopReason::AttemptsExhausted,
                    None,
                );
            }

            let frame = match source.read_frame() {
                Ok(frame) => frame,
                Err(ReadError::NoFrame) => {
                    trace!("no frame this poll");
                    let left = timeout.saturating_sub(started.elapsed());
                    std::thread::sleep(NO_FRAME_BACKOFF.min(left));
                    continue;
                }
                Err(ReadError::Exhausted) => {
                    debug!(attempts = self.attempts_used, "frame source exhausted");
                    return Outcome::Stopped(
                        ScanState::AttemptsExhausted,
                        StopReason::AttemptsExhausted,
                        None,
                    );
                }
            };

            self.attempts_used += 1;
            let attempt = self.attempts_used;
            let (view, offset) = region_view(&frame, self.region_of_interest);
            let resolution = self.resolver.resolve(&view, self.symbologies);
            self.last_frame = Some(frame);

            let Some(resolution) = resolution else {
                debug!(attempt, "no barcode in frame");
                continue;
            };
            match validate_hit(&resolution.hit) {
                Ok(barcode) => {
                    return Outcome::Found {
                        barcode,
                        stage: resolution.stage,
                        bounding_box: resolution
                            .hit
                            .bounding_box
                            .map(|b| b.offset(offset.0, offset.1)),
                    };
                }
                Err(err) => {
                    debug!(
                        attempt,
                        symbology = %resolution.hit.symbology,
                        %err,
                        "discarding invalid hit"
                    );
                }
            }
        }
    }
}

/// The part of `frame` to decode, and its offset inside the frame
fn region_view(frame: &Frame, roi: Option<RegionOfInterest>) -> (Frame, (u32, u32)) {
    let Some(roi) = roi else {
        return (frame.clone(), (0, 0));
    };
    let rect = roi.pixel_rect(frame.width(), frame.height());
    let view = frame.crop(&rect);
    if view.width() == frame.width() && view.height() == frame.height() {
        return (view, (0, 0));
    }
    (view, (rect.x, rect.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_names() {
        let names: Vec<&str> = [
            StopReason::Timeout,
            StopReason::AttemptsExhausted,
            StopReason::Cancelled,
            StopReason::DeviceError,
            StopReason::InvalidImage,
        ]
        .iter()
        .map(|r| r.as_str())
        .collect();
        assert_eq!(
            names,
            ["timeout", "attempts-exhausted", "cancelled", "device-error", "invalid-image"]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ScanState::Idle.is_terminal());
        assert!(!ScanState::Scanning.is_terminal());
        assert!(ScanState::Found.is_terminal());
        assert!(ScanState::DeviceError.is_terminal());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_region_view_offsets() {
        let frame = Frame::from_gray(10, 10, vec![0; 100]).unwrap();
        let (view, offset) = region_view(&frame, Some(RegionOfInterest::CENTER));
        assert_eq!((view.width(), view.height()), (6, 4));
        assert_eq!(offset, (2, 3));

        let (view, offset) = region_view(&frame, None);
        assert_eq!((view.width(), offset), (10, (0, 0)));
    }

    #[test]
    fn test_report_display() {
        let report = ScanReport::invalid_image("bad header");
        assert_eq!(report.to_string(), "not found: invalid-image");
        assert!(!report.is_found());
    }
}
