pub mod dispatcher;
pub mod filter;
pub mod processor;

pub use dispatcher::AlertDispatcher;
pub use filter::{load_patterns, Admission, MessageFilter};
pub use processor::{AlertQueue, RelayProcessor, TicketWorker};
