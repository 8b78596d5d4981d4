//! Service-account credentials, scope lists, signed assertions, and access tokens.

pub mod assertion;
pub mod key;
pub mod scope;
pub mod token;

pub use assertion::*;
pub use key::*;
pub use scope::*;
pub use token::*;
