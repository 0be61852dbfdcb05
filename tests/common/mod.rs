#![allow(dead_code)]

use fin_analyst::domain::dataset::{DatasetStore, Record};
use serde_json::{Value, json};
use std::io::Write;

/// Monthly revenue and cost rows in chronological order.
pub fn monthly_rows(revenue: &[f64]) -> Vec<Record> {
    revenue
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            Record::new()
                .with("mes", format!("2024-{:02}", i + 1).as_str())
                .with("ingresos", r)
                .with("costos", r * 0.6)
        })
        .collect()
}

pub fn store_with(name: &str, revenue: &[f64]) -> DatasetStore {
    let store = DatasetStore::new();
    store.store(name, monthly_rows(revenue));
    store
}

pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    write_temp_file(".ini", content)
}

pub fn write_temp_csv(content: &str) -> tempfile::NamedTempFile {
    write_temp_file(".csv", content)
}

pub const SAMPLE_CSV: &str = "mes,ingresos,costos\n2024-01,100000,60000\n2024-02,120000,70000\n";

pub fn sample_invoice_json() -> Value {
    json!({
        "numero_factura": "FE-100",
        "fecha_emision": "2024-06-01T09:00:00",
        "emisor": {
            "nit": "900123456-7",
            "razon_social": "Analítica SAS",
            "direccion": "Calle 10 #5-20",
            "ciudad": "Bogotá",
            "departamento": "Cundinamarca"
        },
        "cliente": {
            "nit": "800987654-3",
            "razon_social": "Comercial Andina SAS",
            "direccion": "Carrera 7 #45-10",
            "ciudad": "Cali",
            "departamento": "Valle del Cauca",
            "email": "compras@andina.example"
        },
        "items": [
            {
                "line_number": 1,
                "description": "Licencia anual",
                "quantity": 2,
                "unit_price": 500000,
                "subtotal": 1000000,
                "taxes": [{"tax_type": "IVA", "rate": 19, "amount": 190000}],
                "total": 1190000
            }
        ],
        "subtotal": 1000000,
        "total_impuestos": 190000,
        "total": 1190000
    })
}

pub fn sample_credit_note_json() -> Value {
    let invoice = sample_invoice_json();
    json!({
        "numero_nota": "NC-100",
        "factura_afectada": "FE-100",
        "cufe_factura": "abc123",
        "emisor": invoice["emisor"],
        "cliente": invoice["cliente"],
        "motivo": "Descuento posterior",
        "concepto_correccion": "Ajuste de precio",
        "subtotal": 100000,
        "total_impuestos": 19000,
        "total": 119000
    })
}
