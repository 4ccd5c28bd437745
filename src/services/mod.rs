pub mod log_service;

pub use log_service::{paginate, LogService, Window, PAGE_SIZE};
