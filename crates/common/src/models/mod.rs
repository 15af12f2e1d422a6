pub mod bar;
pub mod signal;

pub use bar::{DataOrigin, PriceBar, PriceHistory};
pub use signal::{Action, TradeSignal};
