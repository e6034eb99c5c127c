//! Protocol personality of a hardware function.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol personality a function was loaded with.
///
/// Unrecognized tags are kept as [`Personality::Unknown`] so that the
/// planner, not the profile parser, decides whether they are usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Personality {
    /// Plain L2 Ethernet.
    #[default]
    Eth,
    /// FCoE offload.
    Fcoe,
    /// iSCSI offload.
    Iscsi,
    /// Ethernet with RoCE.
    EthRoce,
    /// Ethernet with iWARP.
    EthIwarp,
    /// Any other personality tag.
    Unknown(String),
}

impl Personality {
    /// Returns the profile tag of this personality.
    pub fn as_str(&self) -> &str {
        match self {
            Personality::Eth => "eth",
            Personality::Fcoe => "fcoe",
            Personality::Iscsi => "iscsi",
            Personality::EthRoce => "eth_roce",
            Personality::EthIwarp => "eth_iwarp",
            Personality::Unknown(tag) => tag,
        }
    }

    /// Returns true for the personalities that run an offloaded protocol.
    pub fn has_offload(&self) -> bool {
        matches!(
            self,
            Personality::Fcoe | Personality::Iscsi | Personality::EthRoce | Personality::EthIwarp
        )
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for Personality {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "eth" => Personality::Eth,
            "fcoe" => Personality::Fcoe,
            "iscsi" => Personality::Iscsi,
            "eth_roce" | "roce" => Personality::EthRoce,
            "eth_iwarp" | "iwarp" => Personality::EthIwarp,
            _ => Personality::Unknown(s),
        }
    }
}

impl From<Personality> for String {
    fn from(p: Personality) -> Self {
        p.as_str().to_string()
    }
}

impl FromStr for Personality {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Personality::from(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!("ETH".parse::<Personality>().unwrap(), Personality::Eth);
        assert_eq!("eth_iwarp".parse::<Personality>().unwrap(), Personality::EthIwarp);
        assert_eq!("roce".parse::<Personality>().unwrap(), Personality::EthRoce);
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let p: Personality = "nvmetcp".parse().unwrap();
        assert_eq!(p, Personality::Unknown("nvmetcp".to_string()));
        assert_eq!(p.to_string(), "nvmetcp");
    }

    #[test]
    fn test_offload_classification() {
        assert!(!Personality::Eth.has_offload());
        assert!(Personality::Iscsi.has_offload());
        assert!(Personality::EthRoce.has_offload());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Personality::EthRoce).unwrap();
        assert_eq!(json, "\"eth_roce\"");
        let p: Personality = serde_json::from_str("\"fcoe\"").unwrap();
        assert_eq!(p, Personality::Fcoe);
    }
}
