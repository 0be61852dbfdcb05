//! Financial ratio calculators.
//!
//! Every ratio is `None` when its denominator is zero or negative. Percent
//! ratios (margin, ROA, ROE) are scaled by 100; nothing is rounded.

use serde::{Deserialize, Serialize};

use crate::domain::error::AnalystError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRatios {
    /// Current assets / current liabilities.
    #[serde(rename = "liquidez_corriente")]
    pub current_ratio: Option<f64>,
    /// (Current assets - inventory) / current liabilities.
    #[serde(rename = "prueba_acida")]
    pub quick_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageRatios {
    #[serde(rename = "razon_endeudamiento")]
    pub debt_ratio: Option<f64>,
    #[serde(rename = "deuda_patrimonio")]
    pub debt_to_equity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityRatios {
    #[serde(rename = "margen_neto")]
    pub net_margin: Option<f64>,
    pub roa: Option<f64>,
    pub roe: Option<f64>,
}

fn ensure_finite(name: &str, value: f64) -> Result<f64, AnalystError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalystError::invalid_input(format!(
            "{name} must be a finite number, got {value}"
        )))
    }
}

fn guarded_div(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

pub fn liquidity_ratios(
    current_assets: f64,
    current_liabilities: f64,
    inventory: Option<f64>,
) -> Result<LiquidityRatios, AnalystError> {
    let assets = ensure_finite("activos_corrientes", current_assets)?;
    let liabilities = ensure_finite("pasivos_corrientes", current_liabilities)?;
    let inventory = inventory
        .map(|v| ensure_finite("inventarios", v))
        .transpose()?;

    Ok(LiquidityRatios {
        current_ratio: guarded_div(assets, liabilities),
        quick_ratio: inventory.and_then(|inv| guarded_div(assets - inv, liabilities)),
    })
}

pub fn leverage_ratios(
    total_liabilities: f64,
    total_assets: f64,
    equity: f64,
) -> Result<LeverageRatios, AnalystError> {
    let liabilities = ensure_finite("pasivos_totales", total_liabilities)?;
    let assets = ensure_finite("activos_totales", total_assets)?;
    let equity = ensure_finite("patrimonio", equity)?;

    Ok(LeverageRatios {
        debt_ratio: guarded_div(liabilities, assets),
        debt_to_equity: guarded_div(liabilities, equity),
    })
}

pub fn profitability_ratios(
    net_income: f64,
    revenue: f64,
    total_assets: f64,
    equity: f64,
) -> Result<ProfitabilityRatios, AnalystError> {
    let income = ensure_finite("utilidad_neta", net_income)?;
    let revenue = ensure_finite("ingresos", revenue)?;
    let assets = ensure_finite("activos_totales", total_assets)?;
    let equity = ensure_finite("patrimonio", equity)?;

    Ok(ProfitabilityRatios {
        net_margin: guarded_div(income, revenue).map(|r| r * 100.0),
        roa: guarded_div(income, assets).map(|r| r * 100.0),
        roe: guarded_div(income, equity).map(|r| r * 100.0),
    })
}
