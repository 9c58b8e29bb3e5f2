//! V-Sync and G-Sync toggle state.

use std::fmt;

/// Availability and enablement of one synchronization technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncToggle {
    available: bool,
    enabled: bool,
}

impl SyncToggle {
    /// An unavailable toggle never reports itself enabled.
    pub fn new(available: bool, enabled: bool) -> Self {
        Self {
            available,
            enabled: available && enabled,
        }
    }

    /// Flips the state. Returns `false` and does nothing when unavailable.
    pub fn toggle(&mut self) -> bool {
        if !self.available {
            return false;
        }
        self.enabled = !self.enabled;
        true
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.available
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `"ON"`, `"OFF"` or `"N/A"`.
    pub fn status(&self) -> &'static str {
        match (self.available, self.enabled) {
            (false, _) => "N/A",
            (true, true) => "ON",
            (true, false) => "OFF",
        }
    }
}

impl fmt::Display for SyncToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status())
    }
}

/// Both toggles shown on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncModes {
    pub vsync: SyncToggle,
    pub gsync: SyncToggle,
}

impl SyncModes {
    /// V-Sync is always available; G-Sync availability is configured.
    pub fn new(vsync_enabled: bool, gsync_available: bool, gsync_enabled: bool) -> Self {
        Self {
            vsync: SyncToggle::new(true, vsync_enabled),
            gsync: SyncToggle::new(gsync_available, gsync_enabled),
        }
    }
}

impl fmt::Display for SyncModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V-SYNC: {} | G-SYNC: {}", self.vsync, self.gsync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_toggle_is_inert() {
        let mut toggle = SyncToggle::new(false, true);
        assert!(!toggle.is_enabled());
        assert!(!toggle.toggle());
        assert!(!toggle.is_enabled());
        assert_eq!(toggle.status(), "N/A");
    }

    #[test]
    fn test_available_toggle_flips() {
        let mut toggle = SyncToggle::new(true, false);
        assert_eq!(toggle.status(), "OFF");
        assert!(toggle.toggle());
        assert_eq!(toggle.status(), "ON");
        assert!(toggle.toggle());
        assert_eq!(toggle.status(), "OFF");
    }

    #[test]
    fn test_modes_display() {
        let modes = SyncModes::new(true, false, false);
        assert_eq!(modes.to_string(), "V-SYNC: ON | G-SYNC: N/A");
    }
}
