use std::time::Duration;

/// Blocking wait used by the sequential stages (belt runs, gripper settle).
pub trait Delay {
    fn wait(&mut self, duration: Duration);
}

pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
