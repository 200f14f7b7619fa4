pub mod cleanup;
pub mod error;
pub mod extension;
pub mod namer;
pub mod relocation;
pub mod scanner;
pub mod sorter;

pub use error::SortError;
pub use scanner::{FileFilter, FileRecord};
pub use sorter::{SortOptions, SortOutcome, SortState, SortStatus, Sorter};
