pub mod authorities;
pub mod entities;
pub mod events;

pub use alarm_core::{DispatchError, DispatchResult, ErrorClass};
pub use authorities::*;
pub use entities::*;
pub use events::*;
