//! OpenSky loan - the collateralized loan state machine
//!
//! Status advances purely as a function of wall-clock time relative to the
//! loan's deadline fields, with two explicit irreversible exceptions
//! (liquidation start and settlement). The receipt is a transferable claim
//! on repayment or liquidation proceeds.

pub mod config;
pub mod error;
pub mod flash;
pub mod loan;

pub use config::CollectionConfig;
pub use error::LoanError;
pub use flash::FlashClaimReceiver;
pub use loan::{Loan, LoanStatus};
