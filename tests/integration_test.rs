//! End-to-end tests across the dataset store, calculators and tool registry.
//!
//! Tests cover:
//! - Reference values for every ratio, trend and DCF calculation
//! - Store replacement semantics and isolation between datasets
//! - Tool batches driven by model-style JSON, including unknown tools
//! - Ratios feeding risk alerts
//! - CSV ingestion into the store

mod common;

use approx::assert_relative_eq;
use common::*;
use fin_analyst::adapters::csv_adapter;
use fin_analyst::domain::dataset::{DatasetStore, Record};
use fin_analyst::domain::dcf;
use fin_analyst::domain::error::AnalystError;
use fin_analyst::domain::ratios::{leverage_ratios, liquidity_ratios, profitability_ratios};
use fin_analyst::domain::risk::{RatioSnapshot, Severity, generate_alerts};
use fin_analyst::domain::tools::{ToolCall, ToolName, dispatch, run_tool_calls};
use fin_analyst::domain::trend::analyze_trend;
use serde_json::json;
use std::sync::Arc;
use std::thread;

mod reference_values {
    use super::*;

    #[test]
    fn current_and_quick_ratio() {
        let r = liquidity_ratios(150_000.0, 100_000.0, Some(30_000.0)).unwrap();
        assert_eq!(r.current_ratio, Some(1.5));
        assert_eq!(r.quick_ratio, Some(1.2));
    }

    #[test]
    fn debt_ratio() {
        let r = leverage_ratios(500_000.0, 1_000_000.0, 500_000.0).unwrap();
        assert_eq!(r.debt_ratio, Some(0.5));
        assert_eq!(r.debt_to_equity, Some(1.0));
    }

    #[test]
    fn net_margin() {
        let r = profitability_ratios(50_000.0, 500_000.0, 1_000_000.0, 600_000.0).unwrap();
        assert_eq!(r.net_margin, Some(10.0));
        assert_relative_eq!(r.roa.unwrap(), 5.0);
        assert_relative_eq!(r.roe.unwrap(), 8.333_333_333, epsilon = 1e-6);
    }

    #[test]
    fn zero_liabilities_never_divide() {
        for liabilities in [0.0, -1.0, -100_000.0] {
            let r = liquidity_ratios(150_000.0, liabilities, Some(10.0)).unwrap();
            assert_eq!(r.current_ratio, None);
            assert_eq!(r.quick_ratio, None);
        }
    }

    #[test]
    fn ratio_calls_are_repeatable() {
        let a = profitability_ratios(1.0, 3.0, 7.0, 11.0).unwrap();
        let b = profitability_ratios(1.0, 3.0, 7.0, 11.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn revenue_growth() {
        let store = store_with("main", &[100_000.0, 120_000.0, 150_000.0]);
        let t = analyze_trend(&store, "main", "ingresos").unwrap();
        assert_eq!(t.growth_rate, Some(50.0));
        assert_eq!(t.data_points, 3);
        assert_eq!(t.median, 120_000.0);
        assert_eq!(t.min, 100_000.0);
        assert_eq!(t.max, 150_000.0);
    }

    #[test]
    fn single_point_is_insufficient() {
        let store = store_with("main", &[100_000.0]);
        let err = analyze_trend(&store, "main", "ingresos").unwrap_err();
        assert!(matches!(
            err,
            AnalystError::InsufficientData {
                points: 1,
                minimum: 2,
                ..
            }
        ));
    }

    #[test]
    fn three_period_dcf() {
        let r = dcf::project(100_000.0, 5.0, 10.0, 3).unwrap();
        assert_eq!(r.projections.len(), 3);
        assert!(r.pv_flows > 0.0);
        assert!(r.has_terminal_value());
        assert_eq!(r.projections[0].projected_flow, 105_000.0);
    }

    #[test]
    fn dcf_without_terminal_when_growth_meets_discount() {
        let r = dcf::project(100_000.0, 10.0, 10.0, 3).unwrap();
        assert_eq!(r.pv_terminal, 0.0);
        assert_eq!(r.total_value, r.pv_flows);
    }
}

mod store_semantics {
    use super::*;

    #[test]
    fn restore_replaces_contents() {
        let store = store_with("main", &[1.0, 2.0, 3.0]);
        store.store("main", monthly_rows(&[10.0, 20.0]));
        assert_eq!(
            store.get_column_values("main", "ingresos").unwrap(),
            vec![10.0, 20.0]
        );
    }

    #[test]
    fn datasets_are_isolated() {
        let store = store_with("a", &[1.0, 2.0]);
        store.store("b", vec![Record::new().with("otro", 5.0)]);
        assert_eq!(store.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.get_column_values("b", "ingresos").unwrap().is_empty());
        assert_eq!(store.get_column_values("a", "ingresos").unwrap().len(), 2);
    }

    #[test]
    fn unknown_dataset_is_not_found() {
        let store = DatasetStore::new();
        let err = analyze_trend(&store, "missing", "ingresos").unwrap_err();
        assert!(matches!(err, AnalystError::NotFound { ref dataset } if dataset == "missing"));
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let store = Arc::new(store_with("main", &[1.0, 2.0, 3.0]));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        store.store(&format!("ds{i}"), monthly_rows(&[1.0, 2.0]));
                    }
                    store.get_column_values("main", "ingresos").unwrap().len()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
        assert_eq!(store.names().len(), 5);
    }
}

mod tool_pipeline {
    use super::*;

    #[test]
    fn store_then_analyze_through_tools() {
        let store = DatasetStore::new();
        let calls = vec![
            ToolCall::new(
                "store_financial_data",
                json!({
                    "data": [
                        {"mes": "2024-01", "ingresos": 100000},
                        {"mes": "2024-02", "ingresos": 120000},
                        {"mes": "2024-03", "ingresos": 150000}
                    ]
                }),
            ),
            ToolCall::new("analyze_trend", json!({})),
        ];
        let outcomes = run_tool_calls(&store, &calls);
        assert!(outcomes.iter().all(|o| o.is_ok()));

        let value = serde_json::to_value(&outcomes[1]).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["result"]["growth_rate"], json!(50.0));
    }

    #[test]
    fn unknown_tool_is_skipped_not_fatal() {
        let store = DatasetStore::new();
        let calls = vec![
            ToolCall::new("__import__", json!({"module": "os"})),
            ToolCall::new(
                "calculate_liquidity_ratios",
                json!({"activos_corrientes": 150000, "pasivos_corrientes": 100000}),
            ),
        ];
        let outcomes = run_tool_calls(&store, &calls);
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());

        let skipped = serde_json::to_value(&outcomes[0]).unwrap();
        assert_eq!(skipped["status"], "skipped");
        assert_eq!(skipped["error"], "unknown tool: __import__");
    }

    #[test]
    fn wrong_argument_types_are_skipped() {
        let store = DatasetStore::new();
        let outcomes = run_tool_calls(
            &store,
            &[ToolCall::new(
                "simple_dcf_projection",
                json!({"flujo_caja_actual": "mucho", "tasa_crecimiento": 5, "tasa_descuento": 10}),
            )],
        );
        assert!(!outcomes[0].is_ok());
    }

    #[test]
    fn ratios_feed_risk_alerts() {
        let store = DatasetStore::new();
        let liquidity = dispatch(
            &store,
            ToolName::CalculateLiquidityRatios,
            json!({"activos_corrientes": 80000, "pasivos_corrientes": 100000}),
        )
        .unwrap();
        let alerts = dispatch(
            &store,
            ToolName::GenerateRiskAlerts,
            json!({ "ratios": liquidity }),
        )
        .unwrap();
        let alerts = alerts.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["severity"], "high");
        assert_eq!(alerts[0]["category"], "liquidez");
    }

    #[test]
    fn dcf_periods_accept_integral_floats() {
        let store = DatasetStore::new();
        let result = dispatch(
            &store,
            ToolName::SimpleDcfProjection,
            json!({"flujo_caja_actual": 100000, "tasa_crecimiento": 5, "tasa_descuento": 10, "periodos": 3.0}),
        )
        .unwrap();
        assert_eq!(result["proyecciones"].as_array().unwrap().len(), 3);
    }
}

mod risk_alerts {
    use super::*;

    #[test]
    fn reference_alerts() {
        let low = generate_alerts(&serde_json::from_value(json!({"liquidez_corriente": 0.8})).unwrap());
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].severity, Severity::High);

        let loss = generate_alerts(&serde_json::from_value(json!({"margen_neto": -5.0})).unwrap());
        assert_eq!(loss.len(), 1);
        assert_eq!(loss[0].severity, Severity::Critical);

        assert!(generate_alerts(&RatioSnapshot::default()).is_empty());
    }
}

mod csv_ingestion {
    use super::*;

    #[test]
    fn csv_file_to_trend() {
        let file = write_temp_csv("mes,ingresos\n2024-01,100000\n2024-02,\n2024-03,150000\n");
        let store = DatasetStore::new();
        let summary = store.store("main", csv_adapter::load_file(file.path()).unwrap());
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.columns, vec!["mes", "ingresos"]);

        let t = analyze_trend(&store, "main", "ingresos").unwrap();
        assert_eq!(t.data_points, 2);
        assert_eq!(t.growth_rate, Some(50.0));
    }
}
