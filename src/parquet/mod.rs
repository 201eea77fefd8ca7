//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod values;

pub use values::save_values;
