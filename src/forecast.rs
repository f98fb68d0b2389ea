//! The demand forecast over the planning horizon.
use crate::error::{PlanningResult, ensure_config};
use crate::input::is_sorted_and_unique;
use crate::units::Quantity;
use serde::{Deserialize, Serialize};

/// Total demand for a single year of the horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastYear {
    /// Calendar year
    pub year: u32,
    /// Total units demanded across all destinations
    pub annual_units: Quantity,
}

/// A validated forecast: non-empty, sorted by year with no repeats and positive demand
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Forecast(Vec<ForecastYear>);

impl Forecast {
    /// Create a new forecast, checking that it is valid
    pub fn new(years: Vec<ForecastYear>) -> PlanningResult<Self> {
        ensure_config!(!years.is_empty(), "forecast must contain at least one year");
        ensure_config!(
            is_sorted_and_unique(years.iter().map(|fy| fy.year)),
            "forecast years must be in increasing order with no repeats"
        );
        for fy in &years {
            ensure_config!(
                fy.annual_units.is_finite() && fy.annual_units > Quantity(0.0),
                "forecast for {} must have positive annual_units",
                fy.year
            );
        }

        Ok(Self(years))
    }

    /// Iterate over the years of the forecast in order
    pub fn iter(&self) -> impl Iterator<Item = &ForecastYear> {
        self.0.iter()
    }

    /// Number of years in the horizon
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated forecast
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first year of the horizon
    pub fn first(&self) -> &ForecastYear {
        // Non-empty by construction
        &self.0[0]
    }

    /// The year with the highest demand (the earliest such year on ties)
    pub fn peak(&self) -> &ForecastYear {
        self.0
            .iter()
            .reduce(|peak, fy| {
                if fy.annual_units > peak.annual_units {
                    fy
                } else {
                    peak
                }
            })
            .unwrap_or_else(|| self.first())
    }

    /// Total demand over the whole horizon
    pub fn total_units(&self) -> Quantity {
        self.0.iter().map(|fy| fy.annual_units).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanningError;
    use rstest::rstest;

    fn forecast_year(year: u32, units: f64) -> ForecastYear {
        ForecastYear {
            year,
            annual_units: Quantity(units),
        }
    }

    #[test]
    fn test_forecast_summaries() {
        let forecast = Forecast::new(vec![
            forecast_year(2025, 100.0),
            forecast_year(2026, 300.0),
            forecast_year(2027, 300.0),
            forecast_year(2028, 200.0),
        ])
        .unwrap();

        assert_eq!(forecast.len(), 4);
        assert_eq!(forecast.first().year, 2025);
        assert_eq!(forecast.peak().year, 2026); // earliest on ties
        assert_eq!(forecast.total_units(), Quantity(900.0));
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![forecast_year(2026, 1.0), forecast_year(2025, 1.0)])]
    #[case(vec![forecast_year(2025, 1.0), forecast_year(2025, 2.0)])]
    #[case(vec![forecast_year(2025, 0.0)])]
    #[case(vec![forecast_year(2025, f64::NAN)])]
    fn test_forecast_invalid(#[case] years: Vec<ForecastYear>) {
        assert!(matches!(
            Forecast::new(years),
            Err(PlanningError::Configuration(_))
        ));
    }

    #[test]
    fn test_forecast_deserialise() {
        let years: Vec<ForecastYear> =
            serde_json::from_str(r#"[{"year": 2025, "annual_units": 1000}]"#).unwrap();
        assert_eq!(years, [forecast_year(2025, 1000.0)]);
    }
}
