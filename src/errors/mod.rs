pub mod provision_error;

pub use provision_error::{ExitCode, ProvisionError};
