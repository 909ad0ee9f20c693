pub mod alert;
pub mod incident;
pub mod notification;
pub mod ticket;

pub use alert::*;
pub use incident::*;
pub use notification::*;
pub use ticket::*;
