//! Outbound volunteer notifications.

pub mod dispatcher;
pub mod gateway;

pub use dispatcher::NotificationDispatcher;
pub use gateway::{
    Notification, NotificationError, NotificationGateway, NotificationKind,
    TracingNotificationGateway,
};
