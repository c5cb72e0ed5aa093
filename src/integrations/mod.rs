//! External service integrations.

pub mod scim_client {
    pub use crate::scim_client::*;
}

pub mod help {
    pub use crate::help::*;
}
