pub mod config;
pub mod detail;
pub mod error;
pub mod guard;
pub mod io;
pub mod lines;
pub mod paths;
pub mod plan;
pub mod revision;
pub mod status;
pub mod store;
pub mod summary;

pub use error::{ProgressError, Result};
pub use revision::{Precondition, Revision};
pub use status::{CheckboxLine, Marker};
pub use store::DocumentStore;
