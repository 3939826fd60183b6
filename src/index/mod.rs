pub mod artifacts;
pub mod build;
pub mod mode;
pub mod query;
pub mod status;
pub mod variant;

pub use build::{BuildError, BuildParams, BuildSummary, construct};
pub use mode::{ModeError, read_mode, write_mode};
pub use query::{QueryError, QueryKind, query_invocation};
pub use variant::{Toolchain, Width};
