mod fixture;
mod report;
mod standing;
mod sync_log;
mod team;

pub use fixture::*;
pub use report::*;
pub use standing::*;
pub use sync_log::*;
pub use team::*;
