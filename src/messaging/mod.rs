pub mod bus;
pub mod event;

pub use bus::{create_notification_bus, NotificationBus, Subscription};
pub use event::{EventMessage, EventType};
