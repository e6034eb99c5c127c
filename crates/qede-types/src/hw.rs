//! Hardware constants of the queue-manager block.

/// Number of physical traffic classes per port.
pub const NUM_OF_PHYS_TCS: u8 = 8;

/// Physical traffic classes per port on the 4-port variant.
pub const NUM_PHYS_TCS_4PORT_K2: u8 = 4;

/// Traffic classes including the pure loopback class.
pub const NUM_OF_TCS: usize = NUM_OF_PHYS_TCS as usize + 1;

/// Reserved traffic class of the pure loopback PQ.
pub const PURE_LB_TC: u8 = 8;

/// Default out-of-order traffic class.
pub const DCBX_TCP_OOO_TC: u8 = 4;

/// Out-of-order traffic class on the 4-port variant.
pub const DCBX_TCP_OOO_K2_4PORT_TC: u8 = 3;

/// Active traffic class bitmap of a port.
pub const ACTIVE_TCS_BMAP: u8 = 0x9f;

/// Active traffic class bitmap of a port on the 4-port variant.
pub const ACTIVE_TCS_BMAP_4PORT_K2: u8 = 0x0f;

/// Packet buffer command lines shared by all ports of an engine.
pub const PBF_MAX_CMD_LINES: u32 = 3328;

/// Buffer blocks shared by all ports of an engine.
pub const BTB_MAX_BLOCKS: u32 = 1440;

/// Port count that identifies the 4-port variant.
pub const MAX_NUM_PORTS_K2: u8 = 4;

/// Offset of transmit PQs in connection contexts.
pub const CM_TX_PQ_BASE: u16 = 0x200;

/// Head PQ id of a traffic class that has no PQ on a vport.
pub const QM_INVALID_PQ_ID: u16 = 0xffff;

/// Resolution of the WFQ fixed-point weight (parts per PF minimum rate).
pub const WFQ_UNIT: u32 = 100;

/// PF rate limit (Mbps) programmed when no maximum bandwidth is requested.
pub const PF_RL_UNLIMITED_MBPS: u32 = 100_000;

/// Rate limiters reserved for the PF default vport.
pub const NUM_DEFAULT_RLS: u16 = 1;

/// Weighted round-robin group of every PQ.
pub const PQ_DEFAULT_WRR_GROUP: u8 = 1;

/// Traffic class of VF PQs.
pub const PQ_DEFAULT_TC: u8 = 0;
