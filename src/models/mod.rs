pub mod progress;
pub mod records;
