// Application layer - use cases and orchestration over the ledger store.

pub mod currency;
pub mod error;
pub mod service;

pub use currency::*;
pub use error::*;
pub use service::*;
