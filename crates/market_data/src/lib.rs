pub mod error;
pub mod remote;
pub mod services;
pub mod synthetic;
pub mod traits;

pub use error::FetchError;
pub use remote::YahooClient;
pub use services::history_service::HistoryService;
pub use traits::HistorySource;
