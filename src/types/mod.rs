pub mod scan;
pub mod trend;

pub use scan::*;
pub use trend::*;
