//! Gateway types module
//!
//! ## Submodules
//! - [`extract`]: body and path extractors that reject with the envelope
//! - [`ledger`]: request and response DTOs of the ledger endpoints
//! - [`response`]: response envelope, `ApiError` and error codes

pub mod extract;
pub mod ledger;
pub mod response;

pub use extract::{JsonBody, PathParam};
pub use ledger::{
    AccountData, BalanceData, CreateAccountRequest, FundRequest, MovementSummaryData,
    StatementData, TransferData, TransferRequestData,
};
pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};
