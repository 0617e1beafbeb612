pub mod request;
pub mod sale;
pub mod session;

pub use request::{SendRequest, ValidationError};
pub use sale::{AmountSource, Customer, LenientAmount, SaleRecord, CUSTOMER_PLACEHOLDER};
pub use session::{ConnectionStatus, SessionState};
