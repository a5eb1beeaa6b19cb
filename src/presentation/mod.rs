pub mod display;

pub use display::{format_duration, format_file_size, print_scan_result, render_json, ScanSummary};
