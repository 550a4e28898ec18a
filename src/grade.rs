use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall verdict for a panel's grand total (out of 300).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Breakout,
    Good,
    Fair,
    Poor,
}

impl Tier {
    pub fn classify(total: u32) -> Tier {
        match total {
            245.. => Tier::Breakout,
            190..=244 => Tier::Good,
            150..=189 => Tier::Fair,
            _ => Tier::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Breakout => "대박",
            Tier::Good => "좋음",
            Tier::Fair => "무난",
            Tier::Poor => "별로",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::classify(245), Tier::Breakout);
        assert_eq!(Tier::classify(244), Tier::Good);
        assert_eq!(Tier::classify(190), Tier::Good);
        assert_eq!(Tier::classify(189), Tier::Fair);
        assert_eq!(Tier::classify(150), Tier::Fair);
        assert_eq!(Tier::classify(149), Tier::Poor);
        assert_eq!(Tier::classify(0), Tier::Poor);
        assert_eq!(Tier::classify(300), Tier::Breakout);
    }

    #[test]
    fn test_tier_is_monotonic() {
        let mut previous = Tier::classify(0);
        for total in 1..=300 {
            let tier = Tier::classify(total);
            assert!(tier <= previous, "tier got worse at {}", total);
            previous = tier;
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Tier::classify(260).to_string(), "대박");
        assert_eq!(Tier::classify(200).label(), "좋음");
        assert_eq!(Tier::classify(160).label(), "무난");
        assert_eq!(Tier::classify(100).label(), "별로");
    }
}
