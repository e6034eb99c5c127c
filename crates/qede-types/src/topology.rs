//! Chip topology as seen by one engine.

use crate::hw;
use serde::{Deserialize, Serialize};

/// Ports, traffic classes and hardware functions of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipTopology {
    /// Physical ports on the engine.
    #[serde(default = "default_num_ports")]
    pub num_ports: u8,

    /// Traffic classes negotiated for the function (DCB result).
    #[serde(default = "default_num_traffic_classes")]
    pub num_traffic_classes: u8,

    /// Hardware functions (engines) behind one device.
    #[serde(default = "default_num_hwfns")]
    pub num_hwfns: u8,
}

fn default_num_ports() -> u8 {
    1
}

fn default_num_traffic_classes() -> u8 {
    1
}

fn default_num_hwfns() -> u8 {
    1
}

impl Default for ChipTopology {
    fn default() -> Self {
        Self {
            num_ports: default_num_ports(),
            num_traffic_classes: default_num_traffic_classes(),
            num_hwfns: default_num_hwfns(),
        }
    }
}

impl ChipTopology {
    /// Returns true on the 4-port variant, which has fewer classes per port.
    pub const fn is_four_port(&self) -> bool {
        self.num_ports == hw::MAX_NUM_PORTS_K2
    }

    /// Physical traffic classes available per port.
    pub const fn max_phys_tcs_per_port(&self) -> u8 {
        if self.is_four_port() {
            hw::NUM_PHYS_TCS_4PORT_K2
        } else {
            hw::NUM_OF_PHYS_TCS
        }
    }

    /// Out-of-order class used unless firmware supplied one.
    pub const fn default_ooo_tc(&self) -> u8 {
        if self.is_four_port() {
            hw::DCBX_TCP_OOO_K2_4PORT_TC
        } else {
            hw::DCBX_TCP_OOO_TC
        }
    }

    /// Active traffic class bitmap programmed on every port.
    pub const fn active_tcs_bitmap(&self) -> u8 {
        if self.is_four_port() {
            hw::ACTIVE_TCS_BMAP_4PORT_K2
        } else {
            hw::ACTIVE_TCS_BMAP
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_port_defaults() {
        let topo = ChipTopology {
            num_ports: 2,
            ..Default::default()
        };
        assert!(!topo.is_four_port());
        assert_eq!(topo.max_phys_tcs_per_port(), 8);
        assert_eq!(topo.default_ooo_tc(), 4);
        assert_eq!(topo.active_tcs_bitmap(), 0x9f);
    }

    #[test]
    fn test_four_port_variant() {
        let topo = ChipTopology {
            num_ports: 4,
            ..Default::default()
        };
        assert!(topo.is_four_port());
        assert_eq!(topo.max_phys_tcs_per_port(), 4);
        assert_eq!(topo.default_ooo_tc(), 3);
        assert_eq!(topo.active_tcs_bitmap(), 0x0f);
    }
}
