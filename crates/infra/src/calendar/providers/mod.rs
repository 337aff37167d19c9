//! Concrete calendar provider variants.

mod google;
mod microsoft;

pub use google::GoogleCalendarProvider;
pub use microsoft::MicrosoftCalendarProvider;
