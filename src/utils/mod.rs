pub mod error;
pub mod logger;
pub mod monitor;
pub mod process;
pub mod validation;
