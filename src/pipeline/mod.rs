pub mod context;
pub mod cursor;
pub mod driver;
pub mod report;

pub use context::{Clock, FixedClock, RunContext, SystemClock};
pub use cursor::{compute_start, StartOrigin, StartPoint};
pub use driver::PipelineDriver;
pub use report::RunReport;
