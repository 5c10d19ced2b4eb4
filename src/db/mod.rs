mod connection;
pub mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use models::{
    AffectReading, Credentials, NewUser, PersonReading, Sample, SampleInput, Session, User, Video,
    ViewingSession,
};
