// Licensed under the Apache-2.0 license

use fugit::MicrosDurationU32;

/// Default bound on a single block operation.
pub const DEFAULT_TIMEOUT: MicrosDurationU32 = MicrosDurationU32::millis(10);
/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: MicrosDurationU32 = MicrosDurationU32::micros(10);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AcceleratorConfig {
    /// Longest time to wait for one block before reporting `HwError::Timeout`.
    pub timeout: MicrosDurationU32,
    /// Delay between busy polls.
    pub poll_interval: MicrosDurationU32,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        AcceleratorConfigBuilder::new().build()
    }
}

pub struct AcceleratorConfigBuilder {
    timeout: MicrosDurationU32,
    poll_interval: MicrosDurationU32,
}

impl Default for AcceleratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceleratorConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
    #[must_use]
    pub const fn timeout(mut self, timeout: MicrosDurationU32) -> Self {
        self.timeout = timeout;
        self
    }
    #[must_use]
    pub const fn poll_interval(mut self, interval: MicrosDurationU32) -> Self {
        self.poll_interval = interval;
        self
    }
    /// A zero poll interval is raised to one microsecond so the timeout
    /// budget always advances.
    #[must_use]
    pub fn build(self) -> AcceleratorConfig {
        let poll_interval = if self.poll_interval.ticks() == 0 {
            MicrosDurationU32::micros(1)
        } else {
            self.poll_interval
        };
        AcceleratorConfig {
            timeout: self.timeout,
            poll_interval,
        }
    }
}
