pub mod dispatcher;
pub mod orchestrator;
pub mod transformer;
pub mod validator;

pub use crate::domain::model::{Event, Row};
pub use crate::domain::ports::{DispatchObserver, EventTransport};
pub use crate::utils::error::Result;
