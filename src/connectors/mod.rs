pub mod csv_file;
pub mod memory;

pub use csv_file::{CsvFileLoader, CsvFileSource};
pub use memory::{MemoryLoader, MemorySource};
