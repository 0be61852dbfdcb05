//! Sales source port.

use crate::domain::error::AnalystError;
use crate::domain::sales_sync::{Sale, SaleDetail, SalesWindow};

pub trait SalesPort {
    fn fetch_sales(&self, window: &SalesWindow) -> Result<Vec<Sale>, AnalystError>;

    fn sale_details(&self, sale_id: &str) -> Result<SaleDetail, AnalystError>;
}
