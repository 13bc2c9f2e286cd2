//! Top-level facade crate for metrix.
//!
//! Re-exports the metric model, the collector and the agent so users can
//! depend on a single crate.

pub mod core {
    pub use metrix_core::*;
}

pub mod server {
    pub use metrix_server::*;
}

pub mod agent {
    pub use metrix_agent::*;
}
