//! Warehouse and inventory cost estimation.
//!
//! Neither estimate depends on the number of facilities in the network, so each is computed once
//! per sweep and shared by every scenario. The estimators are traits so that more detailed models
//! can be plugged in; the defaults here are simple flat-rate calculations.
use crate::config::WarehouseConfig;
use crate::error::PlanningResult;
use crate::forecast::Forecast;
use crate::request::Sku;
use crate::units::{Dimensionless, Money, Quantity};
use serde::Serialize;

/// Units per pallet assumed when no SKU has known packing
pub const DEFAULT_UNITS_PER_PALLET: f64 = 48.0;

/// Warehouse figures for a single year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseYear {
    /// Calendar year
    pub year: u32,
    /// Units handled
    pub units: Quantity,
    /// Units handled per operating day
    pub daily_throughput: Quantity,
    /// Pallet positions needed to hold the stock
    pub pallet_positions: f64,
    /// Cost of handling the units
    pub handling_cost: Money,
    /// Cost of the pallet positions
    pub storage_cost: Money,
    /// Handling plus storage
    pub total_cost: Money,
}

/// Warehouse costs over the horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseEstimate {
    /// Units per pallet used for the estimate
    pub units_per_pallet: f64,
    /// Figures for each year
    pub years: Vec<WarehouseYear>,
    /// Total over all years
    pub total_cost: Money,
}

/// Inventory figures for a single year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryYear {
    /// Calendar year
    pub year: u32,
    /// Average units held in stock
    pub average_inventory: Quantity,
    /// Cost of carrying that stock for the year
    pub carrying_cost: Money,
}

/// Inventory carrying costs over the horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryEstimate {
    /// Figures for each year
    pub years: Vec<InventoryYear>,
    /// Total over all years
    pub total_cost: Money,
}

/// Estimates the cost of operating warehouses over the horizon
pub trait WarehouseEstimator {
    /// Estimate warehouse costs for the forecast
    fn estimate(
        &self,
        forecast: &Forecast,
        skus: &[Sku],
        config: &WarehouseConfig,
    ) -> PlanningResult<WarehouseEstimate>;
}

/// Estimates the cost of holding inventory over the horizon
pub trait InventoryEstimator {
    /// Estimate inventory costs for the forecast
    fn estimate(
        &self,
        forecast: &Forecast,
        skus: &[Sku],
        config: &WarehouseConfig,
    ) -> PlanningResult<InventoryEstimate>;
}

/// Volume-weighted units per pallet across SKUs with known packing
pub fn units_per_pallet(skus: &[Sku]) -> f64 {
    let (volume, weighted) = skus
        .iter()
        .filter_map(|sku| Some((sku.annual_volume.value(), sku.units_per_pallet()?)))
        .fold((0.0, 0.0), |(volume, weighted), (v, upp)| {
            (volume + v, weighted + v * upp)
        });

    if volume > 0.0 {
        weighted / volume
    } else {
        DEFAULT_UNITS_PER_PALLET
    }
}

/// Average units in stock given annual throughput
fn average_inventory(units: Quantity, config: &WarehouseConfig) -> Quantity {
    units * Dimensionless(config.days_of_supply / f64::from(config.operating_days))
}

/// Charges a flat rate per unit handled plus a flat rate per pallet position
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRateWarehouseEstimator;

impl WarehouseEstimator for FlatRateWarehouseEstimator {
    fn estimate(
        &self,
        forecast: &Forecast,
        skus: &[Sku],
        config: &WarehouseConfig,
    ) -> PlanningResult<WarehouseEstimate> {
        let units_per_pallet = units_per_pallet(skus);
        let years: Vec<_> = forecast
            .iter()
            .map(|fy| {
                let daily_throughput =
                    fy.annual_units / Dimensionless(f64::from(config.operating_days));
                let pallet_positions =
                    (daily_throughput.value() * config.days_of_supply / units_per_pallet).ceil();
                let handling_cost = config.cost_per_unit_handled * fy.annual_units;
                let storage_cost = config.cost_per_pallet_position * Dimensionless(pallet_positions);
                WarehouseYear {
                    year: fy.year,
                    units: fy.annual_units,
                    daily_throughput,
                    pallet_positions,
                    handling_cost,
                    storage_cost,
                    total_cost: handling_cost + storage_cost,
                }
            })
            .collect();
        let total_cost = years.iter().map(|year| year.total_cost).sum();

        Ok(WarehouseEstimate {
            units_per_pallet,
            years,
            total_cost,
        })
    }
}

/// Charges a fixed annual rate on the value of the average stock held
#[derive(Debug, Clone, Copy, Default)]
pub struct CarryingCostInventoryEstimator;

impl InventoryEstimator for CarryingCostInventoryEstimator {
    fn estimate(
        &self,
        forecast: &Forecast,
        _skus: &[Sku],
        config: &WarehouseConfig,
    ) -> PlanningResult<InventoryEstimate> {
        let years: Vec<_> = forecast
            .iter()
            .map(|fy| {
                let average_inventory = average_inventory(fy.annual_units, config);
                InventoryYear {
                    year: fy.year,
                    average_inventory,
                    carrying_cost: config.unit_value * average_inventory * config.carrying_cost_rate,
                }
            })
            .collect();
        let total_cost = years.iter().map(|year| year.carrying_cost).sum();

        Ok(InventoryEstimate { years, total_cost })
    }
}
