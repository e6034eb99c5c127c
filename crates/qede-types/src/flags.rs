//! Physical-queue group flags.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags::bitflags! {
    /// Set of physical-queue groups a function needs.
    ///
    /// Each bit names one PQ group of the layout, declared in layout order so
    /// `iter()` walks groups the way the planner lays them out. Group-base
    /// lookups take a single-bit value.
    ///
    /// # Examples
    ///
    /// ```
    /// use qede_types::PqFlags;
    ///
    /// let flags = PqFlags::LB | PqFlags::MCOS;
    /// assert!(flags.contains(PqFlags::LB));
    /// assert!(!flags.contains(PqFlags::VFS));
    /// assert_eq!(flags.to_string(), "MCOS|LB");
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PqFlags: u32 {
        /// PF rate-limited PQs.
        const RLS = 1 << 0;
        /// One PQ per active traffic class.
        const MCOS = 1 << 1;
        /// Pure loopback PQ.
        const LB = 1 << 2;
        /// Out-of-order PQ.
        const OOO = 1 << 3;
        /// Pure ack PQ.
        const ACK = 1 << 4;
        /// Offloaded protocol PQ.
        const OFLD = 1 << 5;
        /// One PQ per VF.
        const VFS = 1 << 6;
    }
}

impl PqFlags {
    /// Returns true if exactly one group is set.
    pub const fn is_single(&self) -> bool {
        self.bits().count_ones() == 1
    }

    /// Returns the name of a single group.
    pub fn name(&self) -> Option<&'static str> {
        if !self.is_single() {
            return None;
        }
        self.iter_names().next().map(|(name, _)| name)
    }
}

impl Default for PqFlags {
    fn default() -> Self {
        PqFlags::empty()
    }
}

impl fmt::Display for PqFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", names.join("|"))?;
        let unknown = self.bits() & !PqFlags::all().bits();
        if unknown != 0 {
            write!(f, "|{:#x}", unknown)?;
        }
        Ok(())
    }
}

impl FromStr for PqFlags {
    type Err = ParseError;

    /// Parses a `|`-separated list of group names, e.g. `"LB|MCOS"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = PqFlags::empty();
        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            let flag = PqFlags::from_name(&part.to_uppercase())
                .ok_or_else(|| ParseError::InvalidPqFlag(part.to_string()))?;
            flags.insert(flag);
        }
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_bit_detection() {
        assert!(PqFlags::LB.is_single());
        assert!(!(PqFlags::LB | PqFlags::OOO).is_single());
        assert!(!PqFlags::empty().is_single());
    }

    #[test]
    fn test_names() {
        assert_eq!(PqFlags::OFLD.name(), Some("OFLD"));
        assert_eq!((PqFlags::LB | PqFlags::OOO).name(), None);
        assert_eq!(PqFlags::from_bits_retain(1 << 9).name(), None);
    }

    #[test]
    fn test_insert_remove() {
        let mut flags = PqFlags::LB;
        flags.insert(PqFlags::VFS);
        assert_eq!(flags.bits().count_ones(), 2);
        flags.remove(PqFlags::LB);
        assert_eq!(flags, PqFlags::VFS);
    }

    #[test]
    fn test_iter_follows_layout_order() {
        let flags = PqFlags::VFS | PqFlags::LB | PqFlags::RLS;
        let order: Vec<PqFlags> = flags.iter().collect();
        assert_eq!(order, vec![PqFlags::RLS, PqFlags::LB, PqFlags::VFS]);

        let every: Vec<PqFlags> = PqFlags::all().iter().collect();
        assert_eq!(every.len(), 7);
        assert_eq!(every[0], PqFlags::RLS);
        assert_eq!(every[6], PqFlags::VFS);
    }

    #[test]
    fn test_display() {
        assert_eq!(PqFlags::empty().to_string(), "NONE");
        assert_eq!(PqFlags::default().to_string(), "NONE");
        assert_eq!(
            (PqFlags::OFLD | PqFlags::ACK | PqFlags::OOO).to_string(),
            "OOO|ACK|OFLD"
        );
        assert_eq!(PqFlags::from_bits_retain(1 << 9).to_string(), "|0x200");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("lb|mcos".parse::<PqFlags>(), Ok(PqFlags::LB | PqFlags::MCOS));
        assert_eq!("".parse::<PqFlags>(), Ok(PqFlags::empty()));
        assert!("LB|BOGUS".parse::<PqFlags>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let flags = PqFlags::LB | PqFlags::MCOS;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "\"MCOS | LB\"");

        let back: PqFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
