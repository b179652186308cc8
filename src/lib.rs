pub mod error;
pub mod grammar;
pub mod record;
pub mod report;
pub mod runlog;
pub mod summary;
pub mod sweep;
pub mod testset;
pub mod verify;

pub use error::{HarnessError, Result};
