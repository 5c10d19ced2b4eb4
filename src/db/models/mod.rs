pub mod affect_reading;
pub mod session;
pub mod user;
pub mod viewing_session;

pub use affect_reading::{AffectReading, PersonReading};
pub use session::Session;
pub use user::{Credentials, NewUser, User, Video};
pub use viewing_session::{Sample, SampleInput, ViewingSession};
