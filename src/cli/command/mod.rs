pub mod import;
pub mod status;

pub use import::import;
pub use status::status;
