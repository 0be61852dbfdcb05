//! Techaura sales API adapter.
//!
//! Only stub mode is implemented: with the stub API key the client serves
//! deterministic mock sales and never touches the network. Any other key
//! fails with [`AnalystError::Unsupported`].

use crate::domain::error::AnalystError;
use crate::domain::sales_sync::{
    STUB_API_KEY, Sale, SaleDetail, SalesSourceConfig, SalesWindow, mock_sale_detail, mock_sales,
};
use crate::ports::sales_port::SalesPort;

pub struct TechauraClient {
    config: SalesSourceConfig,
}

impl TechauraClient {
    pub fn new(config: SalesSourceConfig) -> Self {
        if config.is_stub() {
            tracing::info!("Techaura client in stub mode, no API calls will be made");
        } else {
            tracing::info!(company = %config.company_id, "Techaura client configured");
        }
        Self { config }
    }

    fn live_request(&self, endpoint: &str) -> AnalystError {
        AnalystError::Unsupported {
            reason: format!(
                "live Techaura API ({}{endpoint}) is not implemented; use api_key = {STUB_API_KEY}",
                self.config.api_url
            ),
        }
    }
}

impl SalesPort for TechauraClient {
    fn fetch_sales(&self, window: &SalesWindow) -> Result<Vec<Sale>, AnalystError> {
        tracing::info!(
            from = %window.from.date(),
            to = %window.to.date(),
            limit = window.limit,
            "fetching sales"
        );
        if !self.config.is_stub() {
            return Err(self.live_request(&format!(
                "/api/v1/companies/{}/sales",
                self.config.company_id
            )));
        }
        let sales = mock_sales(window);
        tracing::debug!(count = sales.len(), "generated mock sales");
        Ok(sales)
    }

    fn sale_details(&self, sale_id: &str) -> Result<SaleDetail, AnalystError> {
        tracing::info!(sale_id, "fetching sale details");
        if !self.config.is_stub() {
            return Err(self.live_request(&format!("/api/v1/sales/{sale_id}")));
        }
        Ok(mock_sale_detail(sale_id, chrono::Local::now().naive_local()))
    }
}
