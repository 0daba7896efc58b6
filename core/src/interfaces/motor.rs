use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use super::CollaboratorResult;

/// Belt motor behind a single on/off line.
pub trait MotorDriver {
    fn motor_on(&mut self) -> CollaboratorResult<()>;
    fn motor_off(&mut self) -> CollaboratorResult<()>;
}

/// Drives the belt through a sysfs GPIO `value` file.
pub struct SysfsGpioMotor {
    value_path: PathBuf,
}

impl SysfsGpioMotor {
    pub fn new(value_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
        }
    }

    /// Value file of an exported line, e.g. `/sys/class/gpio/gpio24/value`.
    pub fn for_line(line: u32) -> Self {
        Self::new(format!("/sys/class/gpio/gpio{line}/value"))
    }

    fn write_level(&self, level: &[u8]) -> CollaboratorResult<()> {
        let mut file = OpenOptions::new().write(true).open(&self.value_path)?;
        file.write_all(level)?;
        Ok(())
    }
}

impl MotorDriver for SysfsGpioMotor {
    fn motor_on(&mut self) -> CollaboratorResult<()> {
        self.write_level(b"1")
    }

    fn motor_off(&mut self) -> CollaboratorResult<()> {
        self.write_level(b"0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn sysfs_motor_writes_levels() {
        let temp = NamedTempFile::new().unwrap();
        let mut motor = SysfsGpioMotor::new(temp.path());
        motor.motor_on().unwrap();
        assert_eq!(fs::read_to_string(temp.path()).unwrap(), "1");
        motor.motor_off().unwrap();
        assert_eq!(fs::read_to_string(temp.path()).unwrap(), "0");
    }

    #[test]
    fn sysfs_motor_reports_missing_line() {
        let mut motor = SysfsGpioMotor::new("/nonexistent/gpio/value");
        assert!(motor.motor_on().is_err());
    }
}
