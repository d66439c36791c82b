// Keywarden — Auth Module
//
// Password arbitration (cached, passkey assertion, or dialog), the persisted
// method preference, and keypair derivation from the resolved password.

mod arbiter;
mod method;
mod passkey;

pub use arbiter::{Arbiter, Unlocked};
pub use method::AuthMethod;
pub use passkey::{Assertion, AssertionError, Authenticator, UnavailableAuthenticator};
