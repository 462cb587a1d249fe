//! Job orchestration: admission, execution, retrieval and cascade deletion.

pub mod artifact;
pub mod deletion;
pub mod dispatcher;
pub mod executor;

pub use artifact::{locate_artifact, ArtifactLocation};
pub use deletion::delete_item;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use executor::Executor;
