pub mod scan_service;

pub use scan_service::ScanService;
