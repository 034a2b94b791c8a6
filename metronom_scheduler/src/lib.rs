mod delivery;
mod recurrence;
mod tick;

pub use delivery::DeliveryChannel;
pub use recurrence::fires_on;
pub use tick::TickHandler;
