use std::time::Duration;

/// Background settlement of orders whose browser never came back.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Pause between sweeps.
    pub interval: Duration,
    /// Only orders redirected at least this long ago are swept.
    pub min_age: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(300),
            min_age: Duration::from_secs(900),
        }
    }
}
