//! Sales synchronisation from the Techaura point-of-sale system.
//!
//! Sales are pulled through a [`SalesPort`] and flattened into dataset
//! records (`fecha`, `venta_id`, `cliente`, `subtotal`, `impuestos`, `total`,
//! `metodo_pago`) so the trend and ratio tools can read them like any
//! uploaded CSV.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::domain::dataset::{DatasetStore, Record};
use crate::domain::error::AnalystError;
use crate::domain::timestamp;
use crate::ports::sales_port::SalesPort;

pub const STUB_API_KEY: &str = "stub_api_key";
pub const DEFAULT_API_URL: &str = "https://api.techaura.example.com";
pub const DEFAULT_COMPANY_ID: &str = "stub_company";
pub const DEFAULT_SYNC_LIMIT: usize = 100;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_SALES_DATASET: &str = "ventas";

const ISO_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// Connection settings. The stub key keeps the client offline.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesSourceConfig {
    pub api_key: String,
    pub api_url: String,
    pub company_id: String,
    pub sync_limit: usize,
    pub window_days: i64,
}

impl SalesSourceConfig {
    pub fn is_stub(&self) -> bool {
        self.api_key == STUB_API_KEY
    }
}

impl Default for SalesSourceConfig {
    fn default() -> Self {
        Self {
            api_key: STUB_API_KEY.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            company_id: DEFAULT_COMPANY_ID.to_string(),
            sync_limit: DEFAULT_SYNC_LIMIT,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleProduct {
    pub codigo: String,
    pub nombre: String,
    pub cantidad: u32,
    pub precio_unitario: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descuento: Option<f64>,
    pub subtotal: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iva: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub fecha: NaiveDateTime,
    pub cliente_nit: String,
    pub cliente_nombre: String,
    pub productos: Vec<SaleProduct>,
    pub subtotal: f64,
    pub impuestos: f64,
    pub total: f64,
    pub metodo_pago: String,
    pub estado: String,
}

/// A single sale with customer contact data and seller notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub cliente_email: String,
    pub cliente_telefono: String,
    pub cliente_direccion: String,
    pub descuentos: f64,
    pub vendedor: String,
    pub notas: String,
}

/// Date range and row cap for one sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalesWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    pub limit: usize,
}

impl SalesWindow {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime, limit: usize) -> Result<Self, AnalystError> {
        if from > to {
            return Err(AnalystError::invalid_input(format!(
                "fecha_inicio {} is after fecha_fin {}",
                from.format(ISO_SECONDS),
                to.format(ISO_SECONDS)
            )));
        }
        if limit == 0 {
            return Err(AnalystError::invalid_input("limite must be at least 1"));
        }
        Ok(Self { from, to, limit })
    }

    /// Fills missing bounds: `to` defaults to `now`, `from` to `window_days`
    /// before `to`, `limit` to the configured cap.
    pub fn resolve(
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        limit: Option<usize>,
        config: &SalesSourceConfig,
        now: NaiveDateTime,
    ) -> Result<Self, AnalystError> {
        let to = to.unwrap_or(now);
        let from = match from {
            Some(from) => from,
            None => TimeDelta::try_days(config.window_days)
                .and_then(|span| to.checked_sub_signed(span))
                .ok_or_else(|| {
                    AnalystError::invalid_input(format!(
                        "window of {} days is out of range",
                        config.window_days
                    ))
                })?,
        };
        Self::new(from, to, limit.unwrap_or(config.sync_limit))
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Deterministic sales spread evenly over the window, one per elapsed day
/// up to `limit`. Products and amounts cycle with the sale index.
pub fn mock_sales(window: &SalesWindow) -> Vec<Sale> {
    let days = (window.to - window.from).num_days();
    let count = window.limit.min(days.max(1) as usize);
    let step_ms = days as f64 * 86_400_000.0 / count as f64;

    (0..count)
        .map(|i| {
            let n = i as u64;
            let offset = TimeDelta::milliseconds((i as f64 * step_ms).round() as i64);
            let quantity = 1 + (i % 5) as u32;
            let unit_price = 50_000.0 + (n * 1_000) as f64;
            let subtotal = quantity as f64 * unit_price;
            let product = (i % 10) + 1;
            Sale {
                id: format!("SALE-{:05}", i + 1),
                fecha: window.from + offset,
                cliente_nit: format!("900{i:06}-{}", i % 10),
                cliente_nombre: format!("Cliente {}", i + 1),
                productos: vec![SaleProduct {
                    codigo: format!("PROD-{product:03}"),
                    nombre: format!("Producto {product}"),
                    cantidad: quantity,
                    precio_unitario: unit_price,
                    descuento: None,
                    subtotal,
                    iva: None,
                    total: None,
                }],
                subtotal,
                impuestos: round_cents(subtotal * 0.19),
                total: round_cents(subtotal * 1.19),
                metodo_pago: if i % 2 == 0 { "Tarjeta" } else { "Efectivo" }.to_string(),
                estado: "Completada".to_string(),
            }
        })
        .collect()
}

/// Fixed example detail returned for any id in stub mode.
pub fn mock_sale_detail(sale_id: &str, now: NaiveDateTime) -> SaleDetail {
    SaleDetail {
        sale: Sale {
            id: sale_id.to_string(),
            fecha: now,
            cliente_nit: "900123456-7".to_string(),
            cliente_nombre: "Cliente Ejemplo".to_string(),
            productos: vec![SaleProduct {
                codigo: "PROD-001".to_string(),
                nombre: "Producto Ejemplo".to_string(),
                cantidad: 2,
                precio_unitario: 100_000.0,
                descuento: Some(0.0),
                subtotal: 200_000.0,
                iva: Some(38_000.0),
                total: Some(238_000.0),
            }],
            subtotal: 200_000.0,
            impuestos: 38_000.0,
            total: 238_000.0,
            metodo_pago: "Tarjeta de Crédito".to_string(),
            estado: "Completada".to_string(),
        },
        cliente_email: "cliente@example.com".to_string(),
        cliente_telefono: "+57 300 1234567".to_string(),
        cliente_direccion: "Calle 123 #45-67, Bogotá".to_string(),
        descuentos: 0.0,
        vendedor: "Juan Pérez".to_string(),
        notas: "Venta de prueba".to_string(),
    }
}

pub fn financial_records(sales: &[Sale]) -> Vec<Record> {
    sales
        .iter()
        .map(|sale| {
            Record::new()
                .with("fecha", sale.fecha.format(ISO_SECONDS).to_string().as_str())
                .with("venta_id", sale.id.as_str())
                .with("cliente", sale.cliente_nombre.as_str())
                .with("subtotal", sale.subtotal)
                .with("impuestos", sale.impuestos)
                .with("total", sale.total)
                .with("metodo_pago", sale.metodo_pago.as_str())
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub total_registros: usize,
    pub periodo_inicio: String,
    pub periodo_fin: String,
    pub total_ventas: f64,
    pub total_impuestos: f64,
    pub total_general: f64,
}

impl SyncSummary {
    pub fn from_sales(sales: &[Sale], window: &SalesWindow) -> Self {
        let total_ventas: f64 = sales.iter().map(|s| s.subtotal).sum();
        let total_impuestos: f64 = sales.iter().map(|s| s.impuestos).sum();
        Self {
            total_registros: sales.len(),
            periodo_inicio: window.from.format(ISO_SECONDS).to_string(),
            periodo_fin: window.to.format(ISO_SECONDS).to_string(),
            total_ventas: round_cents(total_ventas),
            total_impuestos: round_cents(total_impuestos),
            total_general: round_cents(total_ventas + total_impuestos),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub message: String,
    pub dataset_name: String,
    pub summary: SyncSummary,
    pub data: Vec<Record>,
}

/// Pulls the window's sales and replaces `dataset` with their records.
pub fn sync_sales(
    source: &dyn SalesPort,
    store: &DatasetStore,
    dataset: &str,
    window: &SalesWindow,
) -> Result<SyncReport, AnalystError> {
    let sales = source.fetch_sales(window)?;
    let summary = SyncSummary::from_sales(&sales, window);
    let data = financial_records(&sales);
    let stored = store.store(dataset, data.clone());
    tracing::info!(
        dataset,
        rows = summary.total_registros,
        total_ventas = summary.total_ventas,
        "synced sales"
    );

    Ok(SyncReport {
        message: stored.to_string(),
        dataset_name: stored.dataset_name,
        summary,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::CellValue;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    struct FixedSales(Vec<Sale>);

    impl SalesPort for FixedSales {
        fn fetch_sales(&self, _window: &SalesWindow) -> Result<Vec<Sale>, AnalystError> {
            Ok(self.0.clone())
        }

        fn sale_details(&self, sale_id: &str) -> Result<SaleDetail, AnalystError> {
            Ok(mock_sale_detail(sale_id, day(1)))
        }
    }

    #[test]
    fn mock_sales_are_capped_by_limit_and_days() {
        let window = SalesWindow::new(day(1), day(10), 5).unwrap();
        let sales = mock_sales(&window);
        assert_eq!(sales.len(), 5);
        assert!(sales.iter().all(|s| s.total > 0.0));

        let wide = SalesWindow::new(day(1), day(10), 100).unwrap();
        assert_eq!(mock_sales(&wide).len(), 9);
    }

    #[test]
    fn mock_sales_are_deterministic() {
        let window = SalesWindow::new(day(1), day(10), 5).unwrap();
        let sales = mock_sales(&window);
        assert_eq!(sales, mock_sales(&window));

        let second = &sales[1];
        assert_eq!(second.id, "SALE-00002");
        assert_eq!(second.cliente_nit, "900000001-1");
        assert_eq!(second.productos[0].codigo, "PROD-002");
        assert_eq!(second.subtotal, 2.0 * 51_000.0);
        assert_eq!(second.impuestos, 19_380.0);
        assert_eq!(second.total, 121_380.0);
        assert_eq!(second.metodo_pago, "Efectivo");
        assert_eq!(second.fecha, day(1) + TimeDelta::hours(43) + TimeDelta::minutes(12));
    }

    #[test]
    fn same_day_window_yields_one_sale() {
        let window = SalesWindow::new(day(3), day(3), 10).unwrap();
        let sales = mock_sales(&window);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].fecha, day(3));
    }

    #[test]
    fn window_rejects_inverted_range_and_zero_limit() {
        assert!(matches!(
            SalesWindow::new(day(5), day(1), 10),
            Err(AnalystError::InvalidInput { .. })
        ));
        assert!(matches!(
            SalesWindow::new(day(1), day(5), 0),
            Err(AnalystError::InvalidInput { .. })
        ));
    }

    #[test]
    fn window_defaults_look_back_from_now() {
        let window =
            SalesWindow::resolve(None, None, None, &SalesSourceConfig::default(), day(31)).unwrap();
        assert_eq!(window.to, day(31));
        assert_eq!(window.from, day(1));
        assert_eq!(window.limit, DEFAULT_SYNC_LIMIT);
    }

    #[test]
    fn records_carry_financial_columns() {
        let window = SalesWindow::new(day(1), day(3), 10).unwrap();
        let records = financial_records(&mock_sales(&window));
        assert_eq!(
            records[0].columns().collect::<Vec<_>>(),
            vec!["fecha", "venta_id", "cliente", "subtotal", "impuestos", "total", "metodo_pago"]
        );
        assert_eq!(
            records[0].get("fecha"),
            Some(&CellValue::Text("2024-01-01T00:00:00".into()))
        );
        assert_eq!(records[0].get("subtotal"), Some(&CellValue::Number(50_000.0)));
    }

    #[test]
    fn sync_stores_records_and_totals_match() {
        let window = SalesWindow::new(day(1), day(8), 100).unwrap();
        let sales = mock_sales(&window);
        let store = DatasetStore::new();
        let report = sync_sales(&FixedSales(sales.clone()), &store, "ventas", &window).unwrap();

        assert_eq!(report.summary.total_registros, 7);
        let subtotal: f64 = report
            .data
            .iter()
            .filter_map(|r| r.get("subtotal").and_then(CellValue::as_number))
            .sum();
        assert!((subtotal - report.summary.total_ventas).abs() < 0.01);
        assert!(
            (report.summary.total_general
                - (report.summary.total_ventas + report.summary.total_impuestos))
                .abs()
                < 0.01
        );
        assert_eq!(
            store.get_column_values("ventas", "total").unwrap().len(),
            sales.len()
        );
        assert_eq!(report.dataset_name, "ventas");
    }

    #[test]
    fn source_failure_leaves_store_untouched() {
        struct Offline;
        impl SalesPort for Offline {
            fn fetch_sales(&self, _window: &SalesWindow) -> Result<Vec<Sale>, AnalystError> {
                Err(AnalystError::Unsupported {
                    reason: "offline".into(),
                })
            }
            fn sale_details(&self, _sale_id: &str) -> Result<SaleDetail, AnalystError> {
                unreachable!()
            }
        }

        let store = DatasetStore::new();
        let window = SalesWindow::new(day(1), day(2), 1).unwrap();
        assert!(sync_sales(&Offline, &store, "ventas", &window).is_err());
        assert!(!store.contains("ventas"));
    }

    #[test]
    fn detail_flattens_sale_fields() {
        let detail = serde_json::to_value(mock_sale_detail("SALE-00001", day(1))).unwrap();
        assert_eq!(detail["id"], "SALE-00001");
        assert_eq!(detail["cliente_nit"], "900123456-7");
        assert_eq!(detail["productos"][0]["iva"], 38_000.0);
        assert_eq!(detail["vendedor"], "Juan Pérez");
    }
}
