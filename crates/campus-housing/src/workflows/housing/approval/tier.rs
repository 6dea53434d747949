use serde::{Deserialize, Serialize};

/// Requested area at which tier-2 sign-off becomes mandatory.
pub const TIER2_AREA_THRESHOLD: f64 = 500.0;
/// Requested area at which tier-3 sign-off becomes mandatory.
pub const TIER3_AREA_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTier {
    Tier1,
    Tier2,
    Tier3,
}

impl ApprovalTier {
    pub const fn ordered() -> [Self; 3] {
        [Self::Tier1, Self::Tier2, Self::Tier3]
    }

    pub const fn level(self) -> u8 {
        match self {
            Self::Tier1 => 1,
            Self::Tier2 => 2,
            Self::Tier3 => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tier1 => "tier 1",
            Self::Tier2 => "tier 2",
            Self::Tier3 => "tier 3",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Tier1 => Some(Self::Tier2),
            Self::Tier2 => Some(Self::Tier3),
            Self::Tier3 => None,
        }
    }

    /// Highest tier that must sign off on a request of the given area.
    pub fn required_for(area: f64) -> Self {
        if area >= TIER3_AREA_THRESHOLD {
            Self::Tier3
        } else if area >= TIER2_AREA_THRESHOLD {
            Self::Tier2
        } else {
            Self::Tier1
        }
    }

    pub const fn designated_role(self) -> ApproverRole {
        match self {
            Self::Tier1 => ApproverRole::DelegatedVicePresident,
            Self::Tier2 => ApproverRole::HousingLeadershipGroup,
            Self::Tier3 => ApproverRole::PresidentsOffice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    DelegatedVicePresident,
    HousingLeadershipGroup,
    PresidentsOffice,
}

impl ApproverRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DelegatedVicePresident => "delegated vice-president",
            Self::HousingLeadershipGroup => "housing leadership group",
            Self::PresidentsOffice => "president's office",
        }
    }

    pub const fn tier(self) -> ApprovalTier {
        match self {
            Self::DelegatedVicePresident => ApprovalTier::Tier1,
            Self::HousingLeadershipGroup => ApprovalTier::Tier2,
            Self::PresidentsOffice => ApprovalTier::Tier3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints_sit_at_500_and_1000() {
        assert_eq!(ApprovalTier::required_for(0.5), ApprovalTier::Tier1);
        assert_eq!(ApprovalTier::required_for(499.99), ApprovalTier::Tier1);
        assert_eq!(ApprovalTier::required_for(500.0), ApprovalTier::Tier2);
        assert_eq!(ApprovalTier::required_for(999.99), ApprovalTier::Tier2);
        assert_eq!(ApprovalTier::required_for(1000.0), ApprovalTier::Tier3);
        assert_eq!(ApprovalTier::required_for(25_000.0), ApprovalTier::Tier3);
    }

    #[test]
    fn required_tier_is_monotonic_in_area() {
        let mut previous = ApprovalTier::Tier1;
        let mut area = 1.0;
        while area < 2_000.0 {
            let tier = ApprovalTier::required_for(area);
            assert!(tier >= previous, "tier dropped at area {area}");
            previous = tier;
            area += 7.5;
        }
        assert_eq!(previous, ApprovalTier::Tier3);
    }

    #[test]
    fn role_table_round_trips_through_tiers() {
        for tier in ApprovalTier::ordered() {
            assert_eq!(tier.designated_role().tier(), tier);
        }
    }
}
