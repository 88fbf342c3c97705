//! Credit market vocabulary: project typologies, regions and purchase modes.
//!
//! Every coefficient the planner needs hangs off these closed enums; see
//! [`coefficients`] for the tables themselves.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod coefficients;

/// First year of the planning horizon.
pub const FIRST_YEAR: u32 = 2025;
/// Last year of the planning horizon.
pub const LAST_YEAR: u32 = 2050;

/// Project category a carbon credit comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Typology {
    NbsRemoval,
    NbsAvoidance,
    Dac,
    Biochar,
    RenewableEnergy,
    BlueCarbon,
}

impl Typology {
    pub const ALL: [Typology; 6] = [
        Typology::NbsRemoval,
        Typology::NbsAvoidance,
        Typology::Dac,
        Typology::Biochar,
        Typology::RenewableEnergy,
        Typology::BlueCarbon,
    ];

    /// Key used for this typology in requests and results.
    pub fn key(self) -> &'static str {
        match self {
            Typology::NbsRemoval => "nbsRemoval",
            Typology::NbsAvoidance => "nbsAvoidance",
            Typology::Dac => "dac",
            Typology::Biochar => "biochar",
            Typology::RenewableEnergy => "renewableEnergy",
            Typology::BlueCarbon => "blueCarbon",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

impl fmt::Display for Typology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The category that completes the active set next to the four fixed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FifthTypology {
    #[default]
    RenewableEnergy,
    BlueCarbon,
}

impl FifthTypology {
    pub fn typology(self) -> Typology {
        match self {
            FifthTypology::RenewableEnergy => Typology::RenewableEnergy,
            FifthTypology::BlueCarbon => Typology::BlueCarbon,
        }
    }
}

/// The five typologies a plan is built from, in result order.
pub fn active_typologies(fifth: FifthTypology) -> [Typology; 5] {
    [
        Typology::NbsRemoval,
        Typology::NbsAvoidance,
        Typology::Dac,
        Typology::Biochar,
        fifth.typology(),
    ]
}

/// Geographic bucket a project is located in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
    NorthAmerica,
    SouthAmerica,
    Europe,
    Africa,
    Asia,
    Oceania,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Europe,
        Region::Africa,
        Region::Asia,
        Region::Oceania,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Region::NorthAmerica => "northAmerica",
            Region::SouthAmerica => "southAmerica",
            Region::Europe => "europe",
            Region::Africa => "africa",
            Region::Asia => "asia",
            Region::Oceania => "oceania",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether credits are bought already issued or financed ahead of delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PurchaseMode {
    /// Spot purchase of issued credits, always credited in full.
    #[serde(rename = "ex-post")]
    ExPost,
    /// Forward purchase, discounted and credited along a delivery curve.
    #[serde(rename = "ex-ante")]
    ExAnte,
}

impl PurchaseMode {
    pub const ALL: [PurchaseMode; 2] = [PurchaseMode::ExPost, PurchaseMode::ExAnte];

    /// Key used for this mode in the request's financing split.
    pub fn split_key(self) -> &'static str {
        match self {
            PurchaseMode::ExPost => "exPost",
            PurchaseMode::ExAnte => "exAnte",
        }
    }

    /// Label used for this mode in results.
    pub fn label(self) -> &'static str {
        match self {
            PurchaseMode::ExPost => "ex-post",
            PurchaseMode::ExAnte => "ex-ante",
        }
    }
}

impl fmt::Display for PurchaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for typology in Typology::ALL {
            assert_eq!(Typology::from_key(typology.key()), Some(typology));
        }
        for region in Region::ALL {
            assert_eq!(Region::from_key(region.key()), Some(region));
        }
        assert_eq!(Typology::from_key("forestry"), None);
    }

    #[test]
    fn test_serde_names_match_keys() {
        let json = serde_json::to_string(&Typology::NbsRemoval).unwrap();
        assert_eq!(json, "\"nbsRemoval\"");
        let json = serde_json::to_string(&Region::SouthAmerica).unwrap();
        assert_eq!(json, "\"southAmerica\"");
        let json = serde_json::to_string(&PurchaseMode::ExAnte).unwrap();
        assert_eq!(json, "\"ex-ante\"");
    }

    #[test]
    fn test_active_set_has_one_fifth_category() {
        let revised = active_typologies(FifthTypology::default());
        assert!(revised.contains(&Typology::RenewableEnergy));
        assert!(!revised.contains(&Typology::BlueCarbon));

        let legacy = active_typologies(FifthTypology::BlueCarbon);
        assert_eq!(legacy[4], Typology::BlueCarbon);
    }
}
