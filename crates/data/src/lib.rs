pub mod boundary;
pub mod cleaner;
pub mod error;
pub mod loader;
pub mod projection;
pub mod store;

pub use boundary::{BoroughBoundary, BoroughIndex};
pub use cleaner::{
    clean_attractions, clean_hotels, clean_restaurants, generate_datasets, CleanReport,
    GenerateSummary,
};
pub use error::{CleanError, LoadError, StoreError};
pub use loader::{load_table, RawRow, RawTable, SourceFormat, SourcePaths};
pub use projection::BoundaryCrs;
pub use store::{CsvStore, DatasetRepository, MemoryStore, Store, DEFAULT_DATA_DIR};
