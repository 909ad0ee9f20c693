pub mod forwarder;
pub mod slack;

pub use forwarder::{Affordance, NotificationForwarder};
pub use slack::{BotIdentity, ChatApi, PostMessage, SlackBlock, SlackClient, SlackElement, SlackText};
