pub mod dashboard;
pub mod samples;
pub mod sessions;
pub mod users;
pub mod viewing_sessions;
