//! Fan-out of bus notifications to connected sockets.

pub mod dispatcher;

pub use dispatcher::NotificationDispatcher;
