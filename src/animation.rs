//! Animation tuning based on the display refresh rate.

use serde::Serialize;

/// Refresh rate assumed when the display cannot be probed
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    HighPerformance,
    Standard,
    PowerSaving,
}

impl AnimationMode {
    pub fn target_fps(&self) -> u32 {
        match self {
            Self::HighPerformance => 120,
            Self::Standard => 60,
            Self::PowerSaving => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollQuality {
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationProfile {
    pub refresh_rate_hz: u32,
    pub mode: AnimationMode,
    pub particle_count: u32,
    pub scroll_quality: ScrollQuality,
}

impl AnimationProfile {
    pub fn for_refresh_rate(refresh_rate_hz: u32) -> Self {
        let mode = if refresh_rate_hz >= 120 {
            AnimationMode::HighPerformance
        } else if refresh_rate_hz >= 60 {
            AnimationMode::Standard
        } else {
            AnimationMode::PowerSaving
        };

        let smooth = refresh_rate_hz >= 60;

        Self {
            refresh_rate_hz,
            mode,
            particle_count: if smooth { 100 } else { 50 },
            scroll_quality: if smooth { ScrollQuality::High } else { ScrollQuality::Normal },
        }
    }
}

/// Display refresh rate; always the 60Hz default, override it through `Config::refresh_rate_hz`
pub fn detect_refresh_rate() -> u32 {
    DEFAULT_REFRESH_RATE_HZ
}
