mod accounts;
mod store;

pub use accounts::{AccountRules, Accounts};
pub use store::SessionStore;

use serde::Serialize;

use crate::identity::Identifier;

/// How a successful login obtained its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginOutcome {
    /// A fresh identifier was issued (new row, or a lapsed row rewritten).
    Created,
    /// The owner's live identifier was handed back unchanged.
    Reused,
}

/// Three-way state of an owner's session row. `login` branches on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectSession {
    NoRow,
    /// The row exists but is inactive or expired.
    Lapsed(Identifier),
    Live(Identifier),
}

/// Opaque password check supplied by the request layer.
pub trait HashVerifier: Send + Sync {
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}
