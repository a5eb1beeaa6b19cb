pub mod request;
pub mod path_matcher;
pub mod script;
pub mod content;
pub mod tree_walker;

pub use request::{ScanOutcome, ScanRequest, ScanResult, ScanStats};
pub use path_matcher::PathMatcher;
pub use script::ScriptDetector;
pub use content::{ContentReader, DecodePolicy, FileContent, ReadError};
pub use tree_walker::{EntryKind, TreeWalker, VisitedEntry, WalkError, WalkEvent};
