//! OpenSky pool - orchestrator
//!
//! One `Pool` holds all ledger state behind a single mutable boundary;
//! `AppContext` wires it to the journal and the external collaborators and
//! replays committed commands on startup.

pub mod command;
pub mod context;
pub mod error;
pub mod pool;

pub use command::PoolCommand;
pub use context::{AppContext, ADMIN, GOVERNOR, LIQUIDATOR};
pub use error::PoolError;
pub use pool::Pool;
