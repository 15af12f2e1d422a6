use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Sell,
    Hold,
    Buy,
}

impl Action {
    /// Maps a classifier output index to an action. The model is trained with
    /// 0 = SELL, 1 = HOLD, 2 = BUY; anything else is treated as BUY, matching
    /// the `else` branch of the class mapping.
    pub fn from_class(class: usize) -> Self {
        match class {
            0 => Action::Sell,
            1 => Action::Hold,
            _ => Action::Buy,
        }
    }

    pub fn signal(&self) -> i8 {
        match self {
            Action::Sell => -1,
            Action::Hold => 0,
            Action::Buy => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Buy => "BUY",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub action: Action,
    pub confidence: f64,
}
