pub mod donation;
pub mod report;
pub mod request;
pub mod review;
pub mod stats;

pub use donation::*;
pub use report::*;
pub use request::*;
pub use review::*;
pub use stats::*;
