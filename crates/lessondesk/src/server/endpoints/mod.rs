pub mod bookings;
pub mod resources;
pub mod schedules;
pub mod session;
pub mod status;
