// Domain-layer modules and shared errors/models
pub mod completion {
    pub use crate::completion::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod profile {
    pub use crate::profile::*;
}

pub mod errors {
    pub use crate::errors::*;
}
