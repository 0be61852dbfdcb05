//! Threshold-based risk alerts over a partial set of ratios.

use serde::{Deserialize, Serialize};

use crate::domain::ratios::{LeverageRatios, LiquidityRatios, ProfitabilityRatios};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAlert {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub recommendation: Option<String>,
}

impl RiskAlert {
    fn new(severity: Severity, category: &str, message: String, recommendation: &str) -> Self {
        Self {
            severity,
            category: category.to_string(),
            message,
            recommendation: Some(recommendation.to_string()),
        }
    }
}

/// Ratios consulted by [`generate_alerts`]. Absent ratios raise nothing;
/// unrecognised keys in the input object are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RatioSnapshot {
    #[serde(rename = "liquidez_corriente", default)]
    pub current_ratio: Option<f64>,
    #[serde(rename = "razon_endeudamiento", default)]
    pub debt_ratio: Option<f64>,
    #[serde(rename = "margen_neto", default)]
    pub net_margin: Option<f64>,
}

impl RatioSnapshot {
    pub fn from_ratios(
        liquidity: Option<&LiquidityRatios>,
        leverage: Option<&LeverageRatios>,
        profitability: Option<&ProfitabilityRatios>,
    ) -> Self {
        Self {
            current_ratio: liquidity.and_then(|l| l.current_ratio),
            debt_ratio: leverage.and_then(|l| l.debt_ratio),
            net_margin: profitability.and_then(|p| p.net_margin),
        }
    }
}

pub fn generate_alerts(ratios: &RatioSnapshot) -> Vec<RiskAlert> {
    let mut alerts = Vec::new();

    if let Some(current) = ratios.current_ratio.filter(|v| v.is_finite()) {
        if current < 1.0 {
            alerts.push(RiskAlert::new(
                Severity::High,
                "liquidez",
                format!(
                    "Razón corriente baja ({current:.2}). La empresa puede tener dificultades para cumplir obligaciones de corto plazo."
                ),
                "Evaluar opciones para mejorar liquidez: reducir gastos, acelerar cobranza, o conseguir financiamiento.",
            ));
        } else if current < 1.5 {
            alerts.push(RiskAlert::new(
                Severity::Medium,
                "liquidez",
                format!("Razón corriente moderada ({current:.2}). Monitorear de cerca."),
                "Mantener un colchón de liquidez adecuado.",
            ));
        }
    }

    if let Some(debt) = ratios.debt_ratio.filter(|v| v.is_finite()) {
        let pct = debt * 100.0;
        if debt > 0.7 {
            alerts.push(RiskAlert::new(
                Severity::High,
                "endeudamiento",
                format!(
                    "Nivel de endeudamiento alto ({pct:.2}%). La empresa está altamente apalancada."
                ),
                "Considerar reducir deuda o aumentar capital propio.",
            ));
        } else if debt > 0.5 {
            alerts.push(RiskAlert::new(
                Severity::Medium,
                "endeudamiento",
                format!("Nivel de endeudamiento moderado-alto ({pct:.2}%)."),
                "Monitorear capacidad de servicio de deuda.",
            ));
        }
    }

    if let Some(margin) = ratios.net_margin.filter(|v| v.is_finite()) {
        if margin < 0.0 {
            alerts.push(RiskAlert::new(
                Severity::Critical,
                "rentabilidad",
                format!(
                    "Margen neto negativo ({margin:.2}%). La empresa está operando con pérdidas."
                ),
                "Analizar estructura de costos y buscar eficiencias operativas urgentemente.",
            ));
        } else if margin < 5.0 {
            alerts.push(RiskAlert::new(
                Severity::Medium,
                "rentabilidad",
                format!("Margen neto bajo ({margin:.2}%). Rentabilidad limitada."),
                "Buscar oportunidades para mejorar márgenes o reducir costos.",
            ));
        }
    }

    alerts
}
