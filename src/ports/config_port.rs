//! Configuration access port.
//!
//! A missing key is `None`; a present value that does not have the requested
//! type is an error. Range checks happen in
//! [`crate::domain::config_validation`].

use crate::domain::error::AnalystError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, AnalystError>;
}
