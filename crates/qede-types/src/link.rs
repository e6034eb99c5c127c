//! Link state and PF bandwidth percentages.

use crate::ParseError;
use serde::{Deserialize, Serialize};

/// Link output as reported by the management firmware, plus the PF
/// bandwidth percentages configured on top of it.
///
/// All rates are in Mbps. A zero `line_speed` means the link is down or
/// not yet known; a zero `min_pf_rate` means WFQ cannot be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    /// Physical line speed.
    #[serde(default)]
    pub line_speed: u32,

    /// Effective PF maximum rate derived from `bandwidth_max`.
    #[serde(default)]
    pub speed: u32,

    /// PF minimum guaranteed rate derived from `bandwidth_min`.
    #[serde(default)]
    pub min_pf_rate: u32,

    /// PF minimum bandwidth, percent of line speed (0 when unset).
    #[serde(default)]
    pub bandwidth_min: u8,

    /// PF maximum bandwidth, percent of line speed.
    #[serde(default = "default_bandwidth_max")]
    pub bandwidth_max: u8,
}

fn default_bandwidth_max() -> u8 {
    100
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            line_speed: 0,
            speed: 0,
            min_pf_rate: 0,
            bandwidth_min: 0,
            bandwidth_max: default_bandwidth_max(),
        }
    }
}

impl LinkState {
    /// Creates a link state for a line speed with no PF limits applied.
    pub fn with_line_speed(line_speed: u32) -> Self {
        Self {
            line_speed,
            speed: line_speed,
            ..Default::default()
        }
    }

    /// Returns true once the line speed is known.
    pub const fn is_up(&self) -> bool {
        self.line_speed != 0
    }

    /// Returns `percent` of the line speed, in Mbps.
    pub const fn percent_of_line(&self, percent: u8) -> u32 {
        ((self.line_speed as u64 * percent as u64) / 100) as u32
    }
}

/// Validates a PF bandwidth percentage (1-100).
pub fn validate_percent(percent: u8) -> Result<u8, ParseError> {
    if (1..=100).contains(&percent) {
        Ok(percent)
    } else {
        Err(ParseError::InvalidPercent(percent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_line() {
        let link = LinkState::with_line_speed(25_000);
        assert_eq!(link.percent_of_line(40), 10_000);
        assert_eq!(link.percent_of_line(100), 25_000);
        assert!(link.is_up());
    }

    #[test]
    fn test_percent_of_line_does_not_overflow() {
        let link = LinkState::with_line_speed(u32::MAX);
        assert_eq!(link.percent_of_line(100), u32::MAX);
    }

    #[test]
    fn test_link_down_by_default() {
        let link = LinkState::default();
        assert!(!link.is_up());
        assert_eq!(link.bandwidth_max, 100);
    }

    #[test]
    fn test_validate_percent() {
        assert_eq!(validate_percent(1), Ok(1));
        assert_eq!(validate_percent(100), Ok(100));
        assert_eq!(validate_percent(0), Err(ParseError::InvalidPercent(0)));
        assert_eq!(validate_percent(101), Err(ParseError::InvalidPercent(101)));
    }
}
