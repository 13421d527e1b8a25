//! Authorization primitives shared by every resource surface.
//!
//! A request carries exactly one [`ActorContext`]. Resource modules build
//! [`Policy`] values, and handlers gate their operations with
//! [`policy_use`]. Operations that run on behalf of the server itself use
//! [`with_system_actor`] instead of a caller-derived actor.

mod actor;
mod error;
mod guard;
mod policy;

pub use actor::{AccountId, ActorContext, ActorId};
pub use error::AuthzError;
pub use guard::{policy_use, with_system_actor};
pub use policy::{Policy, policy};
