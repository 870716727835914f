pub mod forward;
pub mod log;
pub mod services;
