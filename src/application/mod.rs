pub mod config;
pub mod cancel;
pub mod scanner;

pub use config::Config;
pub use cancel::CancelToken;
pub use scanner::{ScanError, Scanner};
