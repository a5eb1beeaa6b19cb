// 三层架构模块
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

// 重新导出主要类型
pub use domain::{ScanRequest, ScanResult, ScriptDetector, PathMatcher, ContentReader};
pub use application::{CancelToken, Config, ScanError, Scanner};
pub use infrastructure::{Logger, LoggerTrait, ErrorLogger, ErrorType};
pub use presentation::{ScanSummary, print_scan_result, render_json};
