use log::{debug, error};

pub use types::error::Error;

/// Collapses an internal report into the error callers get to see.
pub fn normalize(report: eyre::Report) -> Error {
    match report.downcast::<Error>() {
        Ok(e) => {
            debug!("Action failed: {}", e);
            e
        }
        Err(report) => {
            error!("Error occurred: {:?}", report);
            Error::Unexpected
        }
    }
}
