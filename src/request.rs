//! Planning requests.
//!
//! [`RawRequest`] mirrors the JSON document accepted on the command line. It is
//! turned into a [`PlanRequest`] by [`RawRequest::validate`], which is the only
//! place request values are checked: the model builder trusts what it gets.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::AppError;
use crate::config::{Granularity, PlannerConfig};
use crate::market::{PurchaseMode, Region, Typology, active_typologies};

/// `timeConstraints` is either a numeric code or a granularity name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeConstraints {
    Code(i64),
    Name(String),
}

/// Request as it comes off the wire, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub financing: Option<BTreeMap<String, f64>>,
    pub typology: Option<BTreeMap<String, f64>>,
    pub region_allocation: Option<BTreeMap<String, f64>>,
    pub carbon_unit_needs: Option<BTreeMap<String, f64>>,
    pub time_constraints: Option<TimeConstraints>,
    #[serde(default)]
    pub optimize_financing: Option<bool>,
    #[serde(default)]
    pub optimize_region: Option<bool>,
}

/// A checked request, ready to be turned into an allocation model.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub financing: BTreeMap<PurchaseMode, f64>,
    pub typology: BTreeMap<Typology, f64>,
    pub regions: BTreeMap<Region, f64>,
    /// Cumulative volume, in tonnes, that must be credited by each year.
    pub carbon_needs: BTreeMap<u32, f64>,
    pub granularity: Granularity,
    pub optimize_financing: bool,
    pub optimize_region: bool,
}

impl PlanRequest {
    /// Parse and validate a JSON request document.
    pub fn from_json(text: &str, config: &PlannerConfig) -> Result<Self, AppError> {
        let raw: RawRequest = serde_json::from_str(text)
            .map_err(|e| AppError::MalformedRequest(e.to_string()))?;
        raw.validate(config)
    }
}

fn required<T>(
    value: Option<BTreeMap<String, T>>,
    field: &str,
) -> Result<BTreeMap<String, T>, AppError> {
    match value {
        Some(map) if !map.is_empty() => Ok(map),
        _ => Err(AppError::MissingInput(field.to_owned())),
    }
}

fn check_value(field: &str, key: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AppError::InvalidValue {
            field: format!("{field}.{key}"),
            value,
        })
    }
}

/// Validate a fraction group against the keys it must contain and rescale it to sum to 1.
fn split<K: Ord + Copy>(
    field: &str,
    raw: BTreeMap<String, f64>,
    expected: &[K],
    key_name: impl Fn(K) -> &'static str,
    unknown: impl Fn(&str) -> AppError,
    tolerance: f64,
) -> Result<BTreeMap<K, f64>, AppError> {
    let mut fractions = BTreeMap::new();
    for (key, value) in &raw {
        let Some(&parsed) = expected.iter().find(|&&k| key_name(k) == key.as_str()) else {
            return Err(unknown(key));
        };
        fractions.insert(parsed, check_value(field, key, *value)?);
    }

    if let Some(&absent) = expected.iter().find(|k| !fractions.contains_key(*k)) {
        return Err(AppError::MissingInput(format!("{field}.{}", key_name(absent))));
    }

    let sum: f64 = fractions.values().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(AppError::SplitSum {
            group: field.to_owned(),
            sum,
        });
    }

    // Split equalities are only feasible for a group summing to exactly 1
    for fraction in fractions.values_mut() {
        *fraction /= sum;
    }

    Ok(fractions)
}

impl RawRequest {
    /// Check every field and resolve keys against the configured typology set.
    ///
    /// Presence is checked first, in document order, so that the first missing
    /// field is the one reported.
    pub fn validate(self, config: &PlannerConfig) -> Result<PlanRequest, AppError> {
        let financing = required(self.financing, "financing")?;
        let typology = required(self.typology, "typology")?;
        let regions = required(self.region_allocation, "regionAllocation")?;
        let needs = required(self.carbon_unit_needs, "carbonUnitNeeds")?;
        let granularity = match self.time_constraints {
            Some(TimeConstraints::Code(code)) => Granularity::from_code(code),
            Some(TimeConstraints::Name(name)) if !name.trim().is_empty() => {
                Granularity::from_name(name.trim())
            }
            _ => return Err(AppError::MissingInput("timeConstraints".into())),
        };

        let tolerance = config.split_tolerance;
        let financing = split(
            "financing",
            financing,
            &PurchaseMode::ALL,
            PurchaseMode::split_key,
            |key| AppError::MalformedRequest(format!("unknown financing mode `{key}`")),
            tolerance,
        )?;
        let typology = split(
            "typology",
            typology,
            &active_typologies(config.fifth_typology),
            Typology::key,
            |key| AppError::UnexpectedTypology(key.to_owned()),
            tolerance,
        )?;
        let regions = split(
            "regionAllocation",
            regions,
            &Region::ALL,
            Region::key,
            |key| AppError::MalformedRequest(format!("unknown region `{key}`")),
            tolerance,
        )?;

        let mut carbon_needs = BTreeMap::new();
        for (key, value) in &needs {
            let year: i64 = key.trim().parse().map_err(|_| {
                AppError::MalformedRequest(format!("carbon need key `{key}` is not a year"))
            })?;
            let in_horizon = u32::try_from(year)
                .ok()
                .filter(|&y| granularity.slot_of_year(y).is_some());
            let Some(year) = in_horizon else {
                return Err(AppError::YearOutOfRange { year });
            };
            let need = check_value("carbonUnitNeeds", key, *value)?;
            // " 2030" and "2030" collapse onto the larger need
            let entry = carbon_needs.entry(year).or_insert(0.0);
            *entry = f64::max(*entry, need);
        }

        let request = PlanRequest {
            financing,
            typology,
            regions,
            carbon_needs,
            granularity,
            optimize_financing: self.optimize_financing.unwrap_or(false),
            optimize_region: self.optimize_region.unwrap_or(false),
        };
        debug!(
            granularity = granularity.name(),
            needs = request.carbon_needs.len(),
            optimize_financing = request.optimize_financing,
            optimize_region = request.optimize_region,
            "request validated"
        );
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn base_request() -> Value {
        json!({
            "financing": {"exPost": 0.4, "exAnte": 0.6},
            "typology": {
                "nbsRemoval": 0.2, "nbsAvoidance": 0.2, "dac": 0.2,
                "biochar": 0.2, "renewableEnergy": 0.2
            },
            "regionAllocation": {
                "northAmerica": 0.1, "southAmerica": 0.2, "europe": 0.3,
                "africa": 0.2, "asia": 0.1, "oceania": 0.1
            },
            "carbonUnitNeeds": {"2025": 5000000, "2040": 10000000, "2050": 40000000},
            "timeConstraints": 1
        })
    }

    fn validate(value: Value) -> Result<PlanRequest, AppError> {
        PlanRequest::from_json(&value.to_string(), &PlannerConfig::default())
    }

    #[test]
    fn test_valid_request() {
        let request = validate(base_request()).expect("request should validate");
        assert_eq!(request.granularity, Granularity::Yearly);
        assert_eq!(request.financing[&PurchaseMode::ExAnte], 0.6);
        assert_eq!(request.typology.len(), 5);
        assert_eq!(request.regions[&Region::Europe], 0.3);
        assert_eq!(request.carbon_needs[&2040], 10_000_000.0);
        assert!(!request.optimize_financing);
        assert!(!request.optimize_region);
    }

    #[test]
    fn test_missing_fields_are_named() {
        for field in [
            "financing",
            "typology",
            "regionAllocation",
            "carbonUnitNeeds",
            "timeConstraints",
        ] {
            let mut value = base_request();
            value.as_object_mut().unwrap().remove(field);
            assert_eq!(
                validate(value),
                Err(AppError::MissingInput(field.into())),
                "removing {field}"
            );
        }

        let mut value = base_request();
        value["financing"] = json!({});
        assert_eq!(validate(value), Err(AppError::MissingInput("financing".into())));
    }

    #[test]
    fn test_missing_split_key() {
        let mut value = base_request();
        value["regionAllocation"].as_object_mut().unwrap().remove("oceania");
        assert_eq!(
            validate(value),
            Err(AppError::MissingInput("regionAllocation.oceania".into()))
        );
    }

    #[test]
    fn test_split_must_sum_to_one() {
        let mut value = base_request();
        value["financing"] = json!({"exPost": 0.5, "exAnte": 0.6});
        match validate(value) {
            Err(AppError::SplitSum { group, sum }) => {
                assert_eq!(group, "financing");
                assert!((sum - 1.1).abs() < 1e-9);
            }
            other => panic!("unexpected result {other:?}"),
        }

        // Within tolerance, rescaled to sum to one
        let mut value = base_request();
        value["financing"] = json!({"exPost": 0.4, "exAnte": 0.6004});
        let request = validate(value).expect("sum within tolerance");
        let sum: f64 = request.financing.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((request.financing[&PurchaseMode::ExPost] - 0.4 / 1.0004).abs() < 1e-12);
    }

    #[test]
    fn test_negative_fraction() {
        let mut value = base_request();
        value["financing"] = json!({"exPost": -0.2, "exAnte": 1.2});
        assert_eq!(
            validate(value),
            Err(AppError::InvalidValue {
                field: "financing.exPost".into(),
                value: -0.2
            })
        );
    }

    #[test]
    fn test_typology_outside_active_set() {
        let mut value = base_request();
        let typology = value["typology"].as_object_mut().unwrap();
        typology.remove("renewableEnergy");
        typology.insert("blueCarbon".into(), json!(0.2));
        assert_eq!(
            validate(value.clone()),
            Err(AppError::UnexpectedTypology("blueCarbon".into()))
        );

        // Accepted once blue carbon is the configured fifth typology
        let request = PlanRequest::from_json(&value.to_string(), &PlannerConfig::legacy())
            .expect("legacy request should validate");
        assert_eq!(request.typology[&Typology::BlueCarbon], 0.2);
    }

    #[test]
    fn test_years_out_of_range() {
        for year in ["2024", "2051", "-3"] {
            let mut value = base_request();
            let mut needs = serde_json::Map::new();
            needs.insert(year.to_owned(), json!(100));
            value["carbonUnitNeeds"] = Value::Object(needs);
            let expected: i64 = year.parse().unwrap();
            assert_eq!(
                validate(value),
                Err(AppError::YearOutOfRange { year: expected })
            );
        }

        let mut value = base_request();
        value["carbonUnitNeeds"] = json!({"soon": 100});
        assert!(matches!(validate(value), Err(AppError::MalformedRequest(_))));
    }

    #[test]
    fn test_negative_need() {
        let mut value = base_request();
        value["carbonUnitNeeds"] = json!({"2030": -1.0});
        assert!(matches!(
            validate(value),
            Err(AppError::InvalidValue { field, .. }) if field == "carbonUnitNeeds.2030"
        ));
    }

    #[test]
    fn test_time_constraints_forms() {
        let mut value = base_request();
        value["timeConstraints"] = json!(5);
        assert_eq!(validate(value).unwrap().granularity, Granularity::FiveYear);

        let mut value = base_request();
        value["timeConstraints"] = json!("FiveYear");
        assert_eq!(validate(value).unwrap().granularity, Granularity::FiveYear);

        let mut value = base_request();
        value["timeConstraints"] = json!(0);
        assert_eq!(validate(value).unwrap().granularity, Granularity::Flexible);

        let mut value = base_request();
        value["timeConstraints"] = json!("");
        assert_eq!(
            validate(value),
            Err(AppError::MissingInput("timeConstraints".into()))
        );
    }

    #[test]
    fn test_optional_switches() {
        let mut value = base_request();
        value["optimizeFinancing"] = json!(true);
        value["optimizeRegion"] = json!(null);
        let request = validate(value).unwrap();
        assert!(request.optimize_financing);
        assert!(!request.optimize_region);
    }

    #[test]
    fn test_malformed_document() {
        let result = PlanRequest::from_json("{\"financing\": [", &PlannerConfig::default());
        assert!(matches!(result, Err(AppError::MalformedRequest(_))));

        let result = PlanRequest::from_json("[1, 2]", &PlannerConfig::default());
        assert!(matches!(result, Err(AppError::MalformedRequest(_))));
    }
}
