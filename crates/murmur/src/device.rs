//! Push button and status lights

use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Debounce window of the power button
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Push button that toggles the system on and off
///
/// Presses arriving within the debounce window of the last accepted press are
/// contact bounce and are ignored.
#[derive(Debug, Clone)]
pub struct PowerButton {
    debounce: Duration,
    last_press: Option<Instant>,
    on: bool,
}

impl PowerButton {
    /// Create a button in the off state
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_press: None,
            on: false,
        }
    }

    /// Whether the system is on
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Register a press, returning the new state if it was accepted
    pub fn press(&mut self, at: Instant) -> Option<bool> {
        if let Some(last) = self.last_press {
            if at.saturating_duration_since(last) < self.debounce {
                debug!("Ignoring button bounce");
                return None;
            }
        }

        self.last_press = Some(at);
        self.on = !self.on;
        Some(self.on)
    }
}

impl Default for PowerButton {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Indicator lights on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    /// Yellow: listening
    Listening,
    /// Blue: speaking
    Speaking,
}

/// Something that can drive the indicator lights
pub trait StatusLights: Send + Sync {
    /// Switch a light on or off
    fn set(&mut self, light: Light, on: bool);

    /// Switch every light off
    fn all_off(&mut self) {
        self.set(Light::Listening, false);
        self.set(Light::Speaking, false);
    }
}

/// Lights that only exist in the log
#[derive(Debug, Default)]
pub struct LogLights {
    listening: bool,
    speaking: bool,
}

impl LogLights {
    /// Create with both lights off
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a light
    pub fn is_on(&self, light: Light) -> bool {
        match light {
            Light::Listening => self.listening,
            Light::Speaking => self.speaking,
        }
    }
}

impl StatusLights for LogLights {
    fn set(&mut self, light: Light, on: bool) {
        let slot = match light {
            Light::Listening => &mut self.listening,
            Light::Speaking => &mut self.speaking,
        };
        if *slot != on {
            *slot = on;
            info!(light = ?light, on, "Light changed");
        }
    }
}
