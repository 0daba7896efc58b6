use std::fmt;

/// Capture state for one run, owned by the caller and handed by reference to
/// the frame and timer handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSession {
    pub multi_capture_requested: bool,
    pub have_frame1: bool,
    pub need_frame2: bool,
    pub ready_frame2: bool,
    pub did_frame2: bool,
    finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    AwaitingFrame1,
    /// Terminal when only one frame was requested.
    Frame1Captured,
    NudgeScheduled,
    ReadyForFrame2,
    Frame2Captured,
}

impl CaptureSession {
    pub fn new(multi_capture_requested: bool) -> Self {
        Self {
            multi_capture_requested,
            ..Default::default()
        }
    }

    /// Latch set by the terminal transition; every later event is a no-op.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    pub fn phase(&self) -> CapturePhase {
        if self.did_frame2 {
            CapturePhase::Frame2Captured
        } else if self.ready_frame2 {
            CapturePhase::ReadyForFrame2
        } else if self.need_frame2 {
            CapturePhase::NudgeScheduled
        } else if self.have_frame1 {
            CapturePhase::Frame1Captured
        } else {
            CapturePhase::AwaitingFrame1
        }
    }
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapturePhase::AwaitingFrame1 => "awaiting frame 1",
            CapturePhase::Frame1Captured => "frame 1 captured",
            CapturePhase::NudgeScheduled => "nudge scheduled",
            CapturePhase::ReadyForFrame2 => "ready for frame 2",
            CapturePhase::Frame2Captured => "frame 2 captured",
        };
        f.write_str(name)
    }
}
