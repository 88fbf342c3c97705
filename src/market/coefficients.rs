//! Static coefficient tables.
//!
//! Base prices are in USD per tonne for the years 2025 to 2050 and get scaled by
//! a per-region multiplier. Delivery curves are read from the end: the last
//! entry applies to a forward unit bought in the target period itself, the
//! first one to a unit bought as early as the horizon allows.

use super::{FIRST_YEAR, LAST_YEAR, PurchaseMode, Region, Typology};
use crate::config::Granularity;

/// Number of annual prices in every base price table.
pub const PRICE_YEARS: usize = 26;

const NBS_REMOVAL_PRICES: [f64; PRICE_YEARS] = [
    35.158035, 36.0545649, 36.9739563, 37.91679219, 38.88367039, 39.87520398, 40.89202168,
    41.93476824, 43.00410483, 44.1007095, 45.22527759, 46.08455787, 46.96016446, 47.85240759,
    48.76160333, 49.6880738, 50.6321472, 51.594158, 52.574447, 53.57336149, 54.59125536,
    55.62848921, 56.68543051, 57.76245369, 58.85994031, 59.97827917,
];

const NBS_AVOIDANCE_PRICES: [f64; PRICE_YEARS] = [
    23.76730151, 24.31394944, 24.87317028, 25.4452532, 26.03049402, 26.62919538, 27.24166688,
    27.86822521, 28.50919439, 29.16490586, 29.8356987, 30.37274128, 30.91945062, 31.47600073,
    32.04256874, 32.61933498, 33.20648301, 33.8041997, 34.4126753, 35.03210345, 35.66268132,
    36.30460958, 36.95809255, 37.62333822, 38.30055831, 38.98996836,
];

const DAC_PRICES: [f64; PRICE_YEARS] = [
    618.970254, 580.5940983, 544.5972642, 510.8322338, 479.1606353, 449.4526759, 421.58661,
    395.4482402, 370.9304493, 347.9327614, 326.3609302, 322.1182381, 317.930701, 313.7976019,
    309.7182331, 305.6918961, 301.7179014, 297.7955687, 293.9242263, 290.1032114, 286.3318696,
    282.6095553, 278.9356311, 275.3094679, 271.7304448, 268.197949,
];

const BIOCHAR_PRICES: [f64; PRICE_YEARS] = [
    135.7778991, 130.55045, 125.5242577, 120.6915738, 116.0449482, 111.5772177, 107.2814948,
    103.1511572, 99.17983769, 95.36141394, 91.6899995, 89.81035451, 87.96924225, 86.16587278,
    84.39947239, 82.66928321, 80.9745629, 79.31458436, 77.68863538, 76.09601836, 74.53604998,
    73.00806095, 71.5113957, 70.04541209, 68.60948115, 67.20298678,
];

// Shared by renewable energy and blue carbon
const FIFTH_CATEGORY_PRICES: [f64; PRICE_YEARS] = [
    108.68, 104.66, 100.79, 97.06, 93.47, 90.01, 86.68, 83.47, 80.39, 77.41, 74.55, 72.72, 70.94,
    69.20, 67.51, 65.85, 64.24, 62.66, 61.13, 59.63, 58.17, 56.75, 55.36, 54.00, 52.68, 51.39,
];

/// Annual base prices for a typology, indexed by `year - 2025`.
pub fn base_prices(typology: Typology) -> &'static [f64; PRICE_YEARS] {
    match typology {
        Typology::NbsRemoval => &NBS_REMOVAL_PRICES,
        Typology::NbsAvoidance => &NBS_AVOIDANCE_PRICES,
        Typology::Dac => &DAC_PRICES,
        Typology::Biochar => &BIOCHAR_PRICES,
        Typology::RenewableEnergy | Typology::BlueCarbon => &FIFTH_CATEGORY_PRICES,
    }
}

/// Price multiplier applied to a typology's base price in a region.
pub fn regional_multiplier(typology: Typology, region: Region) -> f64 {
    use Region::*;

    match typology {
        Typology::NbsRemoval => match region {
            NorthAmerica => 2.16,
            SouthAmerica => 0.37,
            Europe => 2.43,
            Africa => 0.73,
            Asia => 0.91,
            Oceania => 5.43,
        },
        Typology::NbsAvoidance => match region {
            NorthAmerica => 0.89,
            SouthAmerica => 0.29,
            Europe => 0.96,
            Africa => 0.47,
            Asia => 0.27,
            Oceania => 0.25,
        },
        Typology::Dac => match region {
            NorthAmerica => 0.78,
            SouthAmerica => 0.8,
            Europe => 1.33,
            Africa => 1.11,
            Asia => 0.67,
            Oceania => 1.2,
        },
        Typology::Biochar => match region {
            NorthAmerica => 1.61,
            SouthAmerica => 0.85,
            Europe => 2.0,
            Africa => 1.12,
            Asia => 1.16,
            Oceania => 1.96,
        },
        Typology::RenewableEnergy | Typology::BlueCarbon => match region {
            NorthAmerica => 2.27,
            SouthAmerica => 0.42,
            Europe => 0.99,
            Africa => 0.39,
            Asia => 0.38,
            Oceania => 1.64,
        },
    }
}

/// Price of one tonne bought in `year`, before any forward discount.
///
/// Years outside the horizon are clamped to its ends.
pub fn spot_price(typology: Typology, region: Region, year: u32) -> f64 {
    let index = year.clamp(FIRST_YEAR, LAST_YEAR) - FIRST_YEAR;
    base_prices(typology)[index as usize] * regional_multiplier(typology, region)
}

/// Price of one tonne in the given purchase mode.
pub fn unit_price(
    typology: Typology,
    region: Region,
    year: u32,
    mode: PurchaseMode,
    forward_discount: f64,
) -> f64 {
    let spot = spot_price(typology, region, year);
    match mode {
        PurchaseMode::ExPost => spot,
        PurchaseMode::ExAnte => spot * forward_discount,
    }
}

/// Delivery curve used for a typology at the given granularity.
pub fn delivery_curve(typology: Typology, granularity: Granularity) -> &'static [f64] {
    match (granularity, typology) {
        (Granularity::FiveYear, Typology::NbsRemoval) => &QUINQUENNIAL_REMOVAL_CURVE,
        (Granularity::FiveYear, _) => &QUINQUENNIAL_DEFAULT_CURVE,
        (_, Typology::NbsRemoval) => &ANNUAL_REMOVAL_CURVE,
        (_, _) => &ANNUAL_DEFAULT_CURVE,
    }
}

/// Fraction of a forward tonne credited `offset` slots after it was bought.
///
/// Offsets at or beyond the curve length credit nothing.
pub fn delivery_weight(typology: Typology, granularity: Granularity, offset: usize) -> f64 {
    let curve = delivery_curve(typology, granularity);
    curve
        .len()
        .checked_sub(offset + 1)
        .map_or(0.0, |index| curve[index])
}

/// Fraction of a tonne bought in `mode` at `purchase_slot` credited by `target_slot`.
pub fn credited_fraction(
    typology: Typology,
    granularity: Granularity,
    mode: PurchaseMode,
    purchase_slot: usize,
    target_slot: usize,
) -> f64 {
    if purchase_slot > target_slot {
        return 0.0;
    }
    match mode {
        PurchaseMode::ExPost => 1.0,
        PurchaseMode::ExAnte => {
            delivery_weight(typology, granularity, target_slot - purchase_slot)
        }
    }
}

pub(crate) const ANNUAL_REMOVAL_CURVE: [f64; 26] = [
    0.99592, 0.99592, 0.99592, 0.97068, 0.97068, 0.97068, 0.97068, 0.81757, 0.81757, 0.81757,
    0.81757, 0.37754, 0.37754, 0.37754, 0.37754, 0.07585, 0.07585, 0.07585, 0.07585, 0.01098,
    0.01098, 0.01098, 0.01098, 0.0, 0.0, 0.0,
];

pub(crate) const ANNUAL_DEFAULT_CURVE: [f64; 26] = [
    1.0, 1.0, 1.0, 0.834, 0.834, 0.834, 0.834, 0.667, 0.667, 0.667, 0.667, 0.5, 0.5, 0.5, 0.5,
    0.334, 0.334, 0.334, 0.334, 0.167, 0.167, 0.167, 0.167, 0.0, 0.0, 0.0,
];

pub(crate) const QUINQUENNIAL_REMOVAL_CURVE: [f64; 6] =
    [0.99592, 0.97068, 0.81757, 0.07585, 0.01098, 0.0];

pub(crate) const QUINQUENNIAL_DEFAULT_CURVE: [f64; 6] = [1.0, 0.834, 0.667, 0.334, 0.167, 0.0];
