//! Colombian electronic invoicing (DIAN) stub.
//!
//! Generates CUFE/CUDE identifiers and a skeletal UBL 2.1 document locally.
//! Nothing here is legally valid: there is no XML signature, no certificate
//! handling and no submission to DIAN or a PAC provider. Identifiers include a
//! random nonce, so two calls over the same document differ.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha384};

use crate::domain::error::AnalystError;
use crate::domain::timestamp;

pub const CUFE_LEN: usize = 96;
const TOTALS_TOLERANCE: f64 = 0.01;
const STUB_ACCEPTED: &str = "Aceptado (Stub)";

/// Colombian tax id. Spaces and hyphens are ignored for validation; the
/// original formatting is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nit(String);

impl Nit {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Nit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits: String = value.chars().filter(|c| *c != ' ' && *c != '-').collect();
        if digits.len() < 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err("NIT must be at least 9 digits".to_string());
        }
        Ok(Nit(value))
    }
}

impl From<Nit> for String {
    fn from(nit: Nit) -> Self {
        nit.0
    }
}

impl fmt::Display for Nit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    #[default]
    Cop,
    Usd,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Cop => "COP",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "COP" => Ok(Currency::Cop),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err("Currency must be COP, USD, or EUR".to_string()),
        }
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxDetail {
    pub tax_type: String,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_number: u32,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
    #[serde(default)]
    pub taxes: Vec<TaxDetail>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issuer {
    pub nit: Nit,
    pub razon_social: String,
    pub direccion: String,
    pub ciudad: String,
    pub departamento: String,
    #[serde(default = "default_regimen")]
    pub regimen_fiscal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub nit: Nit,
    pub razon_social: String,
    pub direccion: String,
    pub ciudad: String,
    pub departamento: String,
    pub email: String,
    #[serde(default)]
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub numero_factura: String,
    #[serde(default = "now", deserialize_with = "timestamp::deserialize")]
    pub fecha_emision: NaiveDateTime,
    #[serde(default = "default_tipo_factura")]
    pub tipo_factura: String,
    #[serde(default)]
    pub moneda: Currency,
    pub emisor: Issuer,
    pub cliente: Customer,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub total_impuestos: f64,
    pub total: f64,
    #[serde(default = "default_medio_pago")]
    pub medio_pago: String,
    #[serde(default = "default_forma_pago")]
    pub forma_pago: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNote {
    pub numero_nota: String,
    #[serde(default = "now", deserialize_with = "timestamp::deserialize")]
    pub fecha_emision: NaiveDateTime,
    pub factura_afectada: String,
    pub cufe_factura: String,
    pub emisor: Issuer,
    pub cliente: Customer,
    pub motivo: String,
    pub concepto_correccion: String,
    pub subtotal: f64,
    pub total_impuestos: f64,
    pub total: f64,
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn default_regimen() -> String {
    "Responsable de IVA".to_string()
}

fn default_tipo_factura() -> String {
    "01".to_string()
}

fn default_medio_pago() -> String {
    "10".to_string()
}

fn default_forma_pago() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valido: bool,
    pub errores: Option<Vec<String>>,
}

/// Checks that declared totals agree with the line items.
pub fn validate_invoice(invoice: &Invoice) -> ValidationReport {
    let mut errors = Vec::new();

    let subtotal: f64 = invoice.items.iter().map(|i| i.subtotal).sum();
    if (subtotal - invoice.subtotal).abs() > TOTALS_TOLERANCE {
        errors.push(format!(
            "Subtotal inconsistente: calculado {subtotal}, declarado {}",
            invoice.subtotal
        ));
    }

    let taxes: f64 = invoice
        .items
        .iter()
        .flat_map(|i| i.taxes.iter())
        .map(|t| t.amount)
        .sum();
    if (taxes - invoice.total_impuestos).abs() > TOTALS_TOLERANCE {
        errors.push(format!(
            "Total impuestos inconsistente: calculado {taxes}, declarado {}",
            invoice.total_impuestos
        ));
    }

    let total = invoice.subtotal + invoice.total_impuestos;
    if (total - invoice.total).abs() > TOTALS_TOLERANCE {
        errors.push(format!(
            "Total inconsistente: calculado {total}, declarado {}",
            invoice.total
        ));
    }

    ValidationReport {
        valido: errors.is_empty(),
        errores: (!errors.is_empty()).then_some(errors),
    }
}

fn sha384_hex(components: &[&str]) -> String {
    let mut hasher = Sha384::new();
    for part in components {
        hasher.update(part.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    digest[..CUFE_LEN].to_string()
}

/// Simplified CUFE: SHA-384 over key invoice fields and a random nonce.
pub fn generate_cufe(invoice: &Invoice) -> String {
    let nonce = uuid::Uuid::new_v4().to_string();
    sha384_hex(&[
        &invoice.numero_factura,
        &invoice.fecha_emision.format("%Y-%m-%dT%H:%M:%S").to_string(),
        invoice.emisor.nit.as_str(),
        invoice.cliente.nit.as_str(),
        &format!("{:.2}", invoice.total),
        &nonce,
    ])
}

/// Simplified CUDE for credit notes.
pub fn generate_cude(note: &CreditNote) -> String {
    let nonce = uuid::Uuid::new_v4().to_string();
    sha384_hex(&[
        &note.numero_nota,
        &note.fecha_emision.format("%Y-%m-%dT%H:%M:%S").to_string(),
        &note.factura_afectada,
        &note.cufe_factura,
        &format!("{:.2}", note.total),
        &nonce,
    ])
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn party_xml(tag: &str, nit: &Nit, name: &str) -> String {
    format!(
        "    <cac:{tag}>\n        <cac:Party>\n            <cac:PartyIdentification>\n                <cbc:ID>{nit}</cbc:ID>\n            </cac:PartyIdentification>\n            <cac:PartyName>\n                <cbc:Name>{name}</cbc:Name>\n            </cac:PartyName>\n        </cac:Party>\n    </cac:{tag}>\n",
        nit = xml_escape(nit.as_str()),
        name = xml_escape(name),
    )
}

/// Skeletal UBL 2.1 invoice. Line items are not itemised.
pub fn render_invoice_xml(invoice: &Invoice, cufe: &str) -> String {
    let currency = invoice.moneda.code();
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(concat!(
        "<Invoice xmlns=\"urn:oasis:names:specification:ubl:schema:xsd:Invoice-2\"\n",
        "         xmlns:cac=\"urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2\"\n",
        "         xmlns:cbc=\"urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2\">\n",
    ));
    xml.push_str("    <cbc:UBLVersionID>UBL 2.1</cbc:UBLVersionID>\n");
    xml.push_str(&format!(
        "    <cbc:ID>{}</cbc:ID>\n",
        xml_escape(&invoice.numero_factura)
    ));
    xml.push_str(&format!("    <cbc:UUID>{}</cbc:UUID>\n", xml_escape(cufe)));
    xml.push_str(&format!(
        "    <cbc:IssueDate>{}</cbc:IssueDate>\n",
        invoice.fecha_emision.format("%Y-%m-%d")
    ));
    xml.push_str(&format!(
        "    <cbc:IssueTime>{}</cbc:IssueTime>\n",
        invoice.fecha_emision.format("%H:%M:%S")
    ));
    xml.push_str(&format!(
        "    <cbc:InvoiceTypeCode>{}</cbc:InvoiceTypeCode>\n",
        xml_escape(&invoice.tipo_factura)
    ));
    xml.push_str(&format!(
        "    <cbc:DocumentCurrencyCode>{currency}</cbc:DocumentCurrencyCode>\n"
    ));
    xml.push_str(&party_xml(
        "AccountingSupplierParty",
        &invoice.emisor.nit,
        &invoice.emisor.razon_social,
    ));
    xml.push_str(&party_xml(
        "AccountingCustomerParty",
        &invoice.cliente.nit,
        &invoice.cliente.razon_social,
    ));
    xml.push_str("    <cac:LegalMonetaryTotal>\n");
    for (tag, amount) in [
        ("LineExtensionAmount", invoice.subtotal),
        ("TaxExclusiveAmount", invoice.subtotal),
        ("TaxInclusiveAmount", invoice.total),
        ("PayableAmount", invoice.total),
    ] {
        xml.push_str(&format!(
            "        <cbc:{tag} currencyID=\"{currency}\">{amount:.2}</cbc:{tag}>\n"
        ));
    }
    xml.push_str("    </cac:LegalMonetaryTotal>\n");
    xml.push_str("</Invoice>\n");
    xml
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Stub,
    DianApi,
    PacProvider,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stub => "stub",
            Provider::DianApi => "dian_api",
            Provider::PacProvider => "pac_provider",
        }
    }
}

impl FromStr for Provider {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stub" => Ok(Provider::Stub),
            "dian_api" => Ok(Provider::DianApi),
            "pac_provider" => Ok(Provider::PacProvider),
            other => Err(AnalystError::ConfigInvalid {
                section: "einvoice".to_string(),
                key: "provider".to_string(),
                reason: format!("unknown provider '{other}', expected stub, dian_api or pac_provider"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EInvoiceResponse {
    pub success: bool,
    pub numero_factura: String,
    pub cufe: Option<String>,
    pub estado: String,
    pub mensaje: String,
    pub xml: Option<String>,
    pub errores: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceStatus {
    pub numero_factura: String,
    pub cufe: String,
    pub estado_dian: String,
    pub fecha_validacion: NaiveDateTime,
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EInvoiceService {
    provider: Provider,
    issuer_nit: Option<String>,
}

impl EInvoiceService {
    pub fn new(provider: Provider, issuer_nit: Option<String>) -> Self {
        tracing::info!(provider = provider.as_str(), "e-invoicing service ready");
        Self {
            provider,
            issuer_nit,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn issuer_nit(&self) -> Option<&str> {
        self.issuer_nit.as_deref()
    }

    pub fn issue_invoice(&self, invoice: &Invoice) -> EInvoiceResponse {
        let report = validate_invoice(invoice);
        if !report.valido {
            tracing::warn!(invoice = %invoice.numero_factura, "rejecting inconsistent invoice");
            return EInvoiceResponse {
                success: false,
                numero_factura: invoice.numero_factura.clone(),
                cufe: None,
                estado: "Error".to_string(),
                mensaje: "Error al emitir factura: datos inconsistentes".to_string(),
                xml: None,
                errores: report.errores,
            };
        }

        let cufe = generate_cufe(invoice);
        let xml = render_invoice_xml(invoice, &cufe);
        let (estado, mensaje) = match self.provider {
            Provider::Stub => (
                STUB_ACCEPTED.to_string(),
                "Factura emitida exitosamente (modo stub - no enviada a DIAN)".to_string(),
            ),
            other => (
                "Pendiente".to_string(),
                format!("Enviado a proveedor {}", other.as_str()),
            ),
        };

        tracing::info!(
            invoice = %invoice.numero_factura,
            cufe_prefix = &cufe[..16],
            "invoice issued"
        );

        EInvoiceResponse {
            success: true,
            numero_factura: invoice.numero_factura.clone(),
            cufe: Some(cufe),
            estado,
            mensaje,
            xml: Some(xml),
            errores: None,
        }
    }

    pub fn issue_credit_note(&self, note: &CreditNote) -> EInvoiceResponse {
        let cude = generate_cude(note);
        tracing::info!(note = %note.numero_nota, cude_prefix = &cude[..16], "credit note issued");

        EInvoiceResponse {
            success: true,
            numero_factura: note.numero_nota.clone(),
            cufe: Some(cude),
            estado: STUB_ACCEPTED.to_string(),
            mensaje: "Nota de crédito emitida exitosamente (modo stub)".to_string(),
            xml: None,
            errores: None,
        }
    }

    pub fn query_status(&self, numero_factura: &str, cufe: &str) -> InvoiceStatus {
        tracing::info!(invoice = numero_factura, "querying invoice status");
        InvoiceStatus {
            numero_factura: numero_factura.to_string(),
            cufe: cufe.to_string(),
            estado_dian: STUB_ACCEPTED.to_string(),
            fecha_validacion: now(),
            observaciones: Some("Factura validada exitosamente (modo stub)".to_string()),
        }
    }
}

impl Default for EInvoiceService {
    fn default() -> Self {
        Self::new(Provider::Stub, None)
    }
}
