//! Taskbot Access Gate
//!
//! Gates usage behind an external subscription/profile oracle. The oracle
//! classifies a user session into one of four outcomes; every outcome except
//! `Passed` prompts the user for the missing input and the flow resumes on
//! the next turn. A user-triggered recheck re-consults the oracle exactly
//! once, after merging any newly supplied profile attributes.
//!
//! Oracle failures FAIL OPEN: users are never locked out by oracle
//! unavailability.

mod error;
mod gate;
mod mock;
mod types;

pub use error::OracleError;
pub use gate::AccessGate;
pub use mock::MockOracle;
pub use types::{GateOutcome, ProfileAttrs, ProfileField, SubscriptionOracle};
