//! Model-callable tool registry.
//!
//! Tool names form a closed set; anything outside it is rejected before any
//! argument is looked at. Arguments arrive as a JSON object and are decoded
//! into a typed struct per tool, so a wrong type is an input error rather
//! than a silent coercion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::domain::dataset::{DatasetStore, Record};
use crate::domain::dcf::{self, DEFAULT_PERIODS};
use crate::domain::error::AnalystError;
use crate::domain::ratios;
use crate::domain::risk::{self, RatioSnapshot};
use crate::domain::trend;

pub const DEFAULT_DATASET: &str = "main";
pub const DEFAULT_TREND_COLUMN: &str = "ingresos";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    StoreFinancialData,
    CalculateLiquidityRatios,
    CalculateLeverageRatios,
    CalculateProfitabilityRatios,
    AnalyzeTrend,
    SimpleDcfProjection,
    GenerateRiskAlerts,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::StoreFinancialData,
        ToolName::CalculateLiquidityRatios,
        ToolName::CalculateLeverageRatios,
        ToolName::CalculateProfitabilityRatios,
        ToolName::AnalyzeTrend,
        ToolName::SimpleDcfProjection,
        ToolName::GenerateRiskAlerts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::StoreFinancialData => "store_financial_data",
            ToolName::CalculateLiquidityRatios => "calculate_liquidity_ratios",
            ToolName::CalculateLeverageRatios => "calculate_leverage_ratios",
            ToolName::CalculateProfitabilityRatios => "calculate_profitability_ratios",
            ToolName::AnalyzeTrend => "analyze_trend",
            ToolName::SimpleDcfProjection => "simple_dcf_projection",
            ToolName::GenerateRiskAlerts => "generate_risk_alerts",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AnalystError::UnknownTool {
                name: s.to_string(),
            })
    }
}

/// Function declaration advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub fn declaration(tool: ToolName) -> ToolDeclaration {
    let (description, parameters) = match tool {
        ToolName::StoreFinancialData => (
            "Almacena datos financieros para análisis posterior. Usar cuando se recibe un CSV o datos tabulares.",
            json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "array",
                        "description": "Lista de objetos con datos financieros",
                        "items": {"type": "object"}
                    },
                    "dataset_name": {
                        "type": "string",
                        "description": "Nombre para identificar este conjunto de datos",
                        "default": DEFAULT_DATASET
                    }
                },
                "required": ["data"]
            }),
        ),
        ToolName::CalculateLiquidityRatios => (
            "Calcula ratios de liquidez (razón corriente y prueba ácida)",
            json!({
                "type": "object",
                "properties": {
                    "activos_corrientes": {"type": "number", "description": "Activos corrientes o circulantes"},
                    "pasivos_corrientes": {"type": "number", "description": "Pasivos corrientes o circulantes"},
                    "inventarios": {"type": "number", "description": "Inventarios (opcional, para prueba ácida)"}
                },
                "required": ["activos_corrientes", "pasivos_corrientes"]
            }),
        ),
        ToolName::CalculateLeverageRatios => (
            "Calcula ratios de endeudamiento (razón de endeudamiento y deuda/patrimonio)",
            json!({
                "type": "object",
                "properties": {
                    "pasivos_totales": {"type": "number", "description": "Pasivos totales"},
                    "activos_totales": {"type": "number", "description": "Activos totales"},
                    "patrimonio": {"type": "number", "description": "Patrimonio o capital contable"}
                },
                "required": ["pasivos_totales", "activos_totales", "patrimonio"]
            }),
        ),
        ToolName::CalculateProfitabilityRatios => (
            "Calcula ratios de rentabilidad (ROE, ROA, margen neto)",
            json!({
                "type": "object",
                "properties": {
                    "utilidad_neta": {"type": "number", "description": "Utilidad neta o ganancia neta"},
                    "ingresos": {"type": "number", "description": "Ingresos totales o ventas"},
                    "activos_totales": {"type": "number", "description": "Activos totales"},
                    "patrimonio": {"type": "number", "description": "Patrimonio o capital contable"}
                },
                "required": ["utilidad_neta", "ingresos", "activos_totales", "patrimonio"]
            }),
        ),
        ToolName::AnalyzeTrend => (
            "Analiza tendencias en datos financieros almacenados",
            json!({
                "type": "object",
                "properties": {
                    "dataset_name": {
                        "type": "string",
                        "description": "Nombre del conjunto de datos",
                        "default": DEFAULT_DATASET
                    },
                    "column": {
                        "type": "string",
                        "description": "Nombre de la columna a analizar (ej: ingresos, utilidad_neta)",
                        "default": DEFAULT_TREND_COLUMN
                    }
                },
                "required": []
            }),
        ),
        ToolName::SimpleDcfProjection => (
            "Realiza una proyección simple de flujo de caja descontado (DCF)",
            json!({
                "type": "object",
                "properties": {
                    "flujo_caja_actual": {"type": "number", "description": "Flujo de caja actual o del último periodo"},
                    "tasa_crecimiento": {"type": "number", "description": "Tasa de crecimiento esperada (porcentaje, ej: 5 para 5%)"},
                    "tasa_descuento": {"type": "number", "description": "Tasa de descuento o costo de capital (porcentaje, ej: 10 para 10%)"},
                    "periodos": {"type": "integer", "description": "Número de periodos a proyectar", "default": DEFAULT_PERIODS}
                },
                "required": ["flujo_caja_actual", "tasa_crecimiento", "tasa_descuento"]
            }),
        ),
        ToolName::GenerateRiskAlerts => (
            "Genera alertas de riesgo basadas en ratios financieros",
            json!({
                "type": "object",
                "properties": {
                    "ratios": {
                        "type": "object",
                        "description": "Diccionario con ratios calculados (liquidez_corriente, razon_endeudamiento, margen_neto, etc.)"
                    }
                },
                "required": ["ratios"]
            }),
        ),
    };

    ToolDeclaration {
        name: tool.as_str(),
        description,
        parameters,
    }
}

pub fn declarations() -> Vec<ToolDeclaration> {
    ToolName::ALL.into_iter().map(declaration).collect()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreArgs {
    data: Vec<Record>,
    #[serde(default = "default_dataset")]
    dataset_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LiquidityArgs {
    activos_corrientes: f64,
    pasivos_corrientes: f64,
    #[serde(default)]
    inventarios: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LeverageArgs {
    pasivos_totales: f64,
    activos_totales: f64,
    patrimonio: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfitabilityArgs {
    utilidad_neta: f64,
    ingresos: f64,
    activos_totales: f64,
    patrimonio: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrendArgs {
    #[serde(default = "default_dataset")]
    dataset_name: String,
    #[serde(default = "default_column")]
    column: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DcfArgs {
    flujo_caja_actual: f64,
    tasa_crecimiento: f64,
    tasa_descuento: f64,
    #[serde(default = "default_periods", deserialize_with = "whole_number")]
    periodos: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RiskArgs {
    ratios: RatioSnapshot,
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

fn default_column() -> String {
    DEFAULT_TREND_COLUMN.to_string()
}

fn default_periods() -> u32 {
    DEFAULT_PERIODS
}

/// Models frequently send integers as `5.0`; accept those, reject `5.5`.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )))
    }
}

fn decode<T: for<'de> Deserialize<'de>>(tool: ToolName, arguments: Value) -> Result<T, AnalystError> {
    // A call with no arguments arrives as null from some providers.
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| AnalystError::invalid_input(format!("{tool}: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, AnalystError> {
    serde_json::to_value(value).map_err(|e| AnalystError::invalid_input(e.to_string()))
}

/// Runs one whitelisted tool against `store`.
pub fn dispatch(
    store: &DatasetStore,
    tool: ToolName,
    arguments: Value,
) -> Result<Value, AnalystError> {
    tracing::debug!(tool = %tool, "dispatching tool call");
    match tool {
        ToolName::StoreFinancialData => {
            let args: StoreArgs = decode(tool, arguments)?;
            let summary = store.store(&args.dataset_name, args.data);
            Ok(json!({
                "message": summary.to_string(),
                "dataset_name": summary.dataset_name,
                "row_count": summary.row_count,
                "columns": summary.columns,
            }))
        }
        ToolName::CalculateLiquidityRatios => {
            let args: LiquidityArgs = decode(tool, arguments)?;
            encode(&ratios::liquidity_ratios(
                args.activos_corrientes,
                args.pasivos_corrientes,
                args.inventarios,
            )?)
        }
        ToolName::CalculateLeverageRatios => {
            let args: LeverageArgs = decode(tool, arguments)?;
            encode(&ratios::leverage_ratios(
                args.pasivos_totales,
                args.activos_totales,
                args.patrimonio,
            )?)
        }
        ToolName::CalculateProfitabilityRatios => {
            let args: ProfitabilityArgs = decode(tool, arguments)?;
            encode(&ratios::profitability_ratios(
                args.utilidad_neta,
                args.ingresos,
                args.activos_totales,
                args.patrimonio,
            )?)
        }
        ToolName::AnalyzeTrend => {
            let args: TrendArgs = decode(tool, arguments)?;
            encode(&trend::analyze_trend(store, &args.dataset_name, &args.column)?)
        }
        ToolName::SimpleDcfProjection => {
            let args: DcfArgs = decode(tool, arguments)?;
            encode(&dcf::project(
                args.flujo_caja_actual,
                args.tasa_crecimiento,
                args.tasa_descuento,
                args.periodos,
            )?)
        }
        ToolName::GenerateRiskAlerts => {
            let args: RiskArgs = decode(tool, arguments)?;
            encode(&risk::generate_alerts(&args.ratios))
        }
    }
}

/// A tool invocation as requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Parses the name against the whitelist, then dispatches.
pub fn invoke(store: &DatasetStore, call: &ToolCall) -> Result<Value, AnalystError> {
    let tool: ToolName = call.name.parse()?;
    dispatch(store, tool, call.arguments.clone())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    Ok { name: String, result: Value },
    Skipped { name: String, error: String },
}

impl ToolOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutcome::Ok { .. })
    }
}

/// Executes every call in order. A failing call is logged and reported as
/// skipped; it never stops the rest of the batch.
pub fn run_tool_calls(store: &DatasetStore, calls: &[ToolCall]) -> Vec<ToolOutcome> {
    calls
        .iter()
        .map(|call| match invoke(store, call) {
            Ok(result) => ToolOutcome::Ok {
                name: call.name.clone(),
                result,
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "skipping tool call");
                ToolOutcome::Skipped {
                    name: call.name.clone(),
                    error: e.to_string(),
                }
            }
        })
        .collect()
}
