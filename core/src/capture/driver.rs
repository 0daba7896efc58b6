use log::{info, warn};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use super::machine::{CaptureStateMachine, FrameDecision};
use super::scheduler::TimerQueue;
use super::session::CaptureSession;
use super::CaptureError;
use crate::interfaces::FrameEvent;

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Runs the belt and the capture loop until the machine asks the pipeline
/// to stop; the belt is switched off on the way out. The previous run's log
/// is removed before the belt starts.
///
/// Frame events and timer deadlines are handled one at a time on the calling
/// task, so the session has a single mutator. Returning drops `frames`, which
/// is how the producer learns the pipeline is done. If the producer goes away
/// first, pending timers still run so the belt is never left moving.
pub async fn run_capture(
    machine: &mut CaptureStateMachine,
    session: CaptureSession,
    frames: mpsc::Receiver<FrameEvent>,
) -> Result<CaptureSession, CaptureError> {
    machine.config().validate()?;
    machine.writer().discard()?;
    machine.start_belt();
    let result = capture_loop(machine, session, frames).await;
    machine.stop_belt();
    result
}

async fn capture_loop(
    machine: &mut CaptureStateMachine,
    mut session: CaptureSession,
    mut frames: mpsc::Receiver<FrameEvent>,
) -> Result<CaptureSession, CaptureError> {
    let start = Instant::now();
    let mut timers = TimerQueue::new();
    let mut stream_open = true;

    loop {
        if !stream_open && timers.is_empty() {
            warn!("frame stream closed in phase '{}'", session.phase());
            break;
        }
        let deadline = timers.next_due().map(|due| start + due);
        tokio::select! {
            biased;
            _ = wait_until(deadline) => {
                let now = start.elapsed();
                while let Some(task) = timers.pop_due(now) {
                    machine.on_timer(&mut session, task, now, &mut timers);
                }
            }
            event = frames.recv(), if stream_open => match event {
                Some(event) => {
                    let decision = machine.on_frame(&mut session, &event, start.elapsed(), &mut timers)?;
                    if decision == FrameDecision::Stop {
                        info!("capture finished in phase '{}'", session.phase());
                        break;
                    }
                }
                None => stream_open = false,
            },
        }
    }
    Ok(session)
}
