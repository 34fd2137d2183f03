pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod store;

pub use config::Config;
pub use error::ImportError;
pub use import::{import_file, ImportSummary};
pub use model::{CourseRecord, RawCourse, TimeSlot};
pub use store::CatalogStore;
