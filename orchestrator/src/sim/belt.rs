use chipsortcore::interfaces::{CollaboratorResult, Delay, MotorDriver};
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct BeltState {
    running: bool,
    /// Frame heights travelled since the batch was loaded.
    travel: f64,
}

/// Shared belt model: parts only move while the motor line is high.
#[derive(Clone)]
pub struct SimBelt {
    state: Arc<Mutex<BeltState>>,
    speed: f64,
}

impl SimBelt {
    pub fn new(speed: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(BeltState::default())),
            speed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().map(|state| state.running).unwrap_or(false)
    }

    pub fn travel(&self) -> f64 {
        self.state.lock().map(|state| state.travel).unwrap_or(0.0)
    }

    pub fn advance(&self, elapsed: Duration) {
        if let Ok(mut state) = self.state.lock() {
            if state.running {
                state.travel += self.speed * elapsed.as_secs_f64();
            }
        }
    }

    fn set_running(&self, running: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.running = running;
            debug!("sim belt {} at travel {:.3}", if running { "on" } else { "off" }, state.travel);
        }
    }
}

#[derive(Clone)]
pub struct SimMotor {
    belt: SimBelt,
}

impl SimMotor {
    pub fn new(belt: SimBelt) -> Self {
        Self { belt }
    }
}

impl MotorDriver for SimMotor {
    fn motor_on(&mut self) -> CollaboratorResult<()> {
        self.belt.set_running(true);
        Ok(())
    }

    fn motor_off(&mut self) -> CollaboratorResult<()> {
        self.belt.set_running(false);
        Ok(())
    }
}

/// Delay that moves simulated time forward instead of sleeping.
pub struct SimDelay {
    belt: SimBelt,
}

impl SimDelay {
    pub fn new(belt: SimBelt) -> Self {
        Self { belt }
    }
}

impl Delay for SimDelay {
    fn wait(&mut self, duration: Duration) {
        self.belt.advance(duration);
    }
}
