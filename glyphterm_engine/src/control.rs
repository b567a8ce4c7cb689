//! Frame-loop control signal

/// Signal returned by one presentation tick.
///
/// The driving loop (windowing event loop, daemon, test harness) decides
/// whether to tick again; the renderer only reports whether it can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    /// The frame was presented (or recovered); keep ticking.
    Continue,
    /// The renderer cannot make further progress; stop the loop.
    Stop,
}
