//! Discounted cash-flow projection with a Gordon-growth terminal value.
//!
//! Rates are whole-number percentages. When the discount rate does not exceed
//! the growth rate the perpetuity diverges and the terminal value is taken as
//! zero. That cutoff is a simplification, not a valuation method.

use serde::Serialize;

use crate::domain::error::AnalystError;

pub const DEFAULT_PERIODS: u32 = 5;
pub const MAX_PERIODS: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodProjection {
    #[serde(rename = "periodo")]
    pub period: u32,
    #[serde(rename = "flujo_proyectado")]
    pub projected_flow: f64,
    #[serde(rename = "valor_presente")]
    pub present_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcfResult {
    #[serde(rename = "proyecciones")]
    pub projections: Vec<PeriodProjection>,
    #[serde(rename = "vp_flujos")]
    pub pv_flows: f64,
    #[serde(rename = "vp_terminal")]
    pub pv_terminal: f64,
    #[serde(rename = "valor_total")]
    pub total_value: f64,
    #[serde(rename = "tasa_crecimiento")]
    pub growth_rate: f64,
    #[serde(rename = "tasa_descuento")]
    pub discount_rate: f64,
    #[serde(skip)]
    terminal_applied: bool,
}

impl DcfResult {
    /// True when the discount rate exceeded growth and a terminal value was
    /// computed, even if it rounds to zero.
    pub fn has_terminal_value(&self) -> bool {
        self.terminal_applied
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn project(
    current_flow: f64,
    growth_pct: f64,
    discount_pct: f64,
    periods: u32,
) -> Result<DcfResult, AnalystError> {
    for (name, value) in [
        ("flujo_caja_actual", current_flow),
        ("tasa_crecimiento", growth_pct),
        ("tasa_descuento", discount_pct),
    ] {
        if !value.is_finite() {
            return Err(AnalystError::invalid_input(format!(
                "{name} must be a finite number, got {value}"
            )));
        }
    }
    if periods == 0 || periods > MAX_PERIODS {
        return Err(AnalystError::invalid_input(format!(
            "periodos must be between 1 and {MAX_PERIODS}, got {periods}"
        )));
    }
    if discount_pct <= -100.0 {
        return Err(AnalystError::invalid_input(
            "tasa_descuento must be greater than -100",
        ));
    }

    let g = growth_pct / 100.0;
    let r = discount_pct / 100.0;
    let n = periods as i32;

    let mut projections = Vec::with_capacity(periods as usize);
    let mut pv_total = 0.0;

    for i in 1..=n {
        let flow = current_flow * (1.0 + g).powi(i);
        let pv = flow / (1.0 + r).powi(i);
        pv_total += pv;
        projections.push(PeriodProjection {
            period: i as u32,
            projected_flow: round2(flow),
            present_value: round2(pv),
        });
    }

    let terminal_applied = r > g;
    let pv_terminal = if terminal_applied {
        let terminal_flow = current_flow * (1.0 + g).powi(n) * (1.0 + g);
        let terminal_value = terminal_flow / (r - g);
        terminal_value / (1.0 + r).powi(n)
    } else {
        0.0
    };

    Ok(DcfResult {
        projections,
        pv_flows: round2(pv_total),
        pv_terminal: round2(pv_terminal),
        total_value: round2(pv_total + pv_terminal),
        growth_rate: growth_pct,
        discount_rate: discount_pct,
        terminal_applied,
    })
}
