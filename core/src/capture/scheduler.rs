use std::collections::VecDeque;
use std::time::Duration;

/// Steps of the inter-frame nudge. Each one is scheduled by the handler of
/// the step before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    StartNudge,
    StopNudge,
}

/// Pending tasks on a single logical clock, measured from the start of the
/// run. Tasks due at the same instant keep their scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: VecDeque<(Duration, TimerTask)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration, task: TimerTask) {
        let position = self
            .pending
            .iter()
            .position(|(at, _)| *at > due)
            .unwrap_or(self.pending.len());
        self.pending.insert(position, (due, task));
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.front().map(|(due, _)| *due)
    }

    /// Removes and returns the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerTask> {
        match self.pending.front() {
            Some((due, _)) if *due <= now => self.pending.pop_front().map(|(_, task)| task),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_pop_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_millis(2500), TimerTask::StopNudge);
        timers.schedule(Duration::from_millis(1000), TimerTask::StartNudge);
        assert_eq!(timers.next_due(), Some(Duration::from_millis(1000)));
        assert_eq!(timers.pop_due(Duration::from_millis(999)), None);
        assert_eq!(
            timers.pop_due(Duration::from_secs(3)),
            Some(TimerTask::StartNudge)
        );
        assert_eq!(
            timers.pop_due(Duration::from_secs(3)),
            Some(TimerTask::StopNudge)
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn equal_deadlines_keep_insertion_order() {
        let mut timers = TimerQueue::new();
        let at = Duration::from_secs(1);
        timers.schedule(at, TimerTask::StartNudge);
        timers.schedule(at, TimerTask::StopNudge);
        assert_eq!(timers.pop_due(at), Some(TimerTask::StartNudge));
        assert_eq!(timers.pop_due(at), Some(TimerTask::StopNudge));
    }
}
