//! Who is calling, and what they may do.

mod policy;
mod token;

pub use policy::{AccessPolicy, DefaultPolicy, VortexUser};
pub use token::TokenExtractor;
