pub mod entities;
pub mod ports;
pub mod value_objects;

pub use entities::*;
pub use ports::*;
pub use syncer_errors::{SyncerError, SyncerResult};
pub use value_objects::*;
