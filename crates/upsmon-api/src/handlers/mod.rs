pub mod device;
pub mod ingest;
pub mod stats;

pub use device::*;
pub use ingest::*;
pub use stats::*;
