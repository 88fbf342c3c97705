//! Planner configuration.
//!
//! [`PlannerConfig`] gathers the constants the allocation model is built with.
//! [`Granularity`] decides how the horizon is cut into purchase slots and
//! [`PlanShape`] is the resulting set of model parameters.

use std::time::Duration;

use clap::ValueEnum;

use crate::lp_solver::SolverOptions;
use crate::market::{FIRST_YEAR, FifthTypology, LAST_YEAR};

/// Price factor applied to forward (ex-ante) purchases.
pub const FORWARD_DISCOUNT: f64 = 0.87;
/// Minimum share of total spend that has to land in every slot.
pub const FLOOR_FRACTION: f64 = 0.015;
/// Accepted deviation of a fraction group from 1.
pub const SPLIT_TOLERANCE: f64 = 1e-3;

/// How purchases are spread over the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One slot per year with a spend ceiling and floor.
    Yearly,
    /// One slot every five years with a spend ceiling and floor.
    FiveYear,
    /// One slot per year with a spend ceiling only.
    Flexible,
}

impl Granularity {
    /// Interpret the request's `timeConstraints` code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Granularity::Yearly,
            5 => Granularity::FiveYear,
            _ => Granularity::Flexible,
        }
    }

    /// Interpret the request's `timeConstraints` name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Yearly" => Granularity::Yearly,
            "FiveYear" => Granularity::FiveYear,
            _ => Granularity::Flexible,
        }
    }

    /// Years between two consecutive slots.
    pub fn stride(self) -> u32 {
        match self {
            Granularity::FiveYear => 5,
            Granularity::Yearly | Granularity::Flexible => 1,
        }
    }

    pub fn slot_count(self) -> usize {
        ((LAST_YEAR - FIRST_YEAR) / self.stride() + 1) as usize
    }

    /// Whether the model keeps a minimum spend in every slot.
    pub fn has_floor(self) -> bool {
        !matches!(self, Granularity::Flexible)
    }

    /// Calendar year a slot opens in.
    pub fn year_of_slot(self, slot: usize) -> u32 {
        FIRST_YEAR + slot as u32 * self.stride()
    }

    /// Slot a calendar year falls into, `None` outside the horizon.
    pub fn slot_of_year(self, year: u32) -> Option<usize> {
        (FIRST_YEAR..=LAST_YEAR)
            .contains(&year)
            .then(|| ((year - FIRST_YEAR) / self.stride()) as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            Granularity::Yearly => "yearly",
            Granularity::FiveYear => "five-year",
            Granularity::Flexible => "flexible",
        }
    }
}

/// Set of spend ceilings used by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CapProfile {
    /// Caps of the first planner release.
    Legacy,
    /// Caps tuned for the generalised typology set.
    #[default]
    Revised,
}

impl CapProfile {
    /// Largest share of total spend a single slot may take.
    pub fn ceiling(self, granularity: Granularity) -> f64 {
        match (self, granularity) {
            (CapProfile::Legacy, Granularity::Yearly) => 0.15,
            (CapProfile::Legacy, Granularity::FiveYear) => 0.40,
            (CapProfile::Legacy, Granularity::Flexible) => 0.30,
            (CapProfile::Revised, Granularity::Yearly) => 0.08,
            (CapProfile::Revised, Granularity::FiveYear) => 0.25,
            (CapProfile::Revised, Granularity::Flexible) => 0.33,
        }
    }
}

/// Constants the allocation model is built with.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub profile: CapProfile,
    pub fifth_typology: FifthTypology,
    pub forward_discount: f64,
    pub floor_fraction: f64,
    pub split_tolerance: f64,
    pub solver: SolverOptions,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            profile: CapProfile::default(),
            fifth_typology: FifthTypology::default(),
            forward_discount: FORWARD_DISCOUNT,
            floor_fraction: FLOOR_FRACTION,
            split_tolerance: SPLIT_TOLERANCE,
            solver: SolverOptions::default(),
        }
    }
}

impl PlannerConfig {
    /// Configuration of the first planner release: blue carbon and the legacy caps.
    pub fn legacy() -> Self {
        Self {
            profile: CapProfile::Legacy,
            fifth_typology: FifthTypology::BlueCarbon,
            ..Self::default()
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.solver.time_limit = Some(limit);
        self
    }

    /// Model parameters for a granularity.
    pub fn shape(&self, granularity: Granularity) -> PlanShape {
        PlanShape {
            granularity,
            slots: granularity.slot_count(),
            stride: granularity.stride(),
            ceiling: self.profile.ceiling(granularity),
            floor: granularity.has_floor().then_some(self.floor_fraction),
        }
    }
}

/// Parameters that differ between the yearly, five-year and flexible models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanShape {
    pub granularity: Granularity,
    pub slots: usize,
    pub stride: u32,
    /// Largest share of total spend in a single slot.
    pub ceiling: f64,
    /// Smallest share of total spend in every slot, when enforced.
    pub floor: Option<f64>,
}

impl PlanShape {
    pub fn year_of_slot(&self, slot: usize) -> u32 {
        self.granularity.year_of_slot(slot)
    }

    pub fn slot_of_year(&self, year: u32) -> Option<usize> {
        self.granularity.slot_of_year(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_codes() {
        assert_eq!(Granularity::from_code(1), Granularity::Yearly);
        assert_eq!(Granularity::from_code(5), Granularity::FiveYear);
        assert_eq!(Granularity::from_code(0), Granularity::Flexible);
        assert_eq!(Granularity::from_code(-1), Granularity::Flexible);
        assert_eq!(Granularity::from_name("FiveYear"), Granularity::FiveYear);
        assert_eq!(Granularity::from_name("NoConstraint"), Granularity::Flexible);
    }

    #[test]
    fn test_slots_cover_the_horizon() {
        assert_eq!(Granularity::Yearly.slot_count(), 26);
        assert_eq!(Granularity::Flexible.slot_count(), 26);
        assert_eq!(Granularity::FiveYear.slot_count(), 6);

        assert_eq!(Granularity::FiveYear.year_of_slot(5), 2050);
        assert_eq!(Granularity::Yearly.year_of_slot(25), 2050);
    }

    #[test]
    fn test_slot_of_year() {
        assert_eq!(Granularity::Yearly.slot_of_year(2040), Some(15));
        assert_eq!(Granularity::FiveYear.slot_of_year(2029), Some(0));
        assert_eq!(Granularity::FiveYear.slot_of_year(2030), Some(1));
        assert_eq!(Granularity::FiveYear.slot_of_year(2050), Some(5));
        assert_eq!(Granularity::Yearly.slot_of_year(2024), None);
        assert_eq!(Granularity::Yearly.slot_of_year(2051), None);
    }

    #[test]
    fn test_shapes_by_profile() {
        let revised = PlannerConfig::default();
        let shape = revised.shape(Granularity::Yearly);
        assert_eq!(shape.ceiling, 0.08);
        assert_eq!(shape.floor, Some(0.015));

        let shape = revised.shape(Granularity::Flexible);
        assert_eq!(shape.ceiling, 0.33);
        assert_eq!(shape.floor, None);

        let legacy = PlannerConfig::legacy();
        assert_eq!(legacy.shape(Granularity::FiveYear).ceiling, 0.40);
        assert_eq!(legacy.fifth_typology, FifthTypology::BlueCarbon);
    }

    #[test]
    fn test_time_limit() {
        let config = PlannerConfig::default().with_time_limit(Duration::from_secs(3));
        assert_eq!(config.solver.time_limit, Some(Duration::from_secs(3)));
    }
}
