use std::fmt;

/// Market indicators served by this process. Also the key of the staleness cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Vix,
    Gold,
    YieldSpread,
    Dxy,
    Buffett,
}

/// What an endpoint does once its chain is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// HTTP 200 with a zero value, so a front-end never sees an error.
    Neutral,
    /// HTTP 500 with the diagnostics list.
    ServerError,
}

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::Vix,
        Indicator::Gold,
        Indicator::YieldSpread,
        Indicator::Dxy,
        Indicator::Buffett,
    ];

    /// Key used in the aggregate response.
    pub fn key(self) -> &'static str {
        match self {
            Indicator::Vix => "vix",
            Indicator::Gold => "gold",
            Indicator::YieldSpread => "yieldSpread",
            Indicator::Dxy => "dxy",
            Indicator::Buffett => "buffett",
        }
    }

    /// Name of the JSON field that carries the headline number.
    pub fn value_field(self) -> &'static str {
        match self {
            Indicator::YieldSpread => "spread",
            Indicator::Buffett => "ratio",
            Indicator::Vix | Indicator::Gold | Indicator::Dxy => "price",
        }
    }

    pub fn failure_policy(self) -> FailurePolicy {
        match self {
            Indicator::Gold | Indicator::YieldSpread => FailurePolicy::Neutral,
            Indicator::Vix | Indicator::Dxy | Indicator::Buffett => FailurePolicy::ServerError,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Indicator::Vix => "VIX",
            Indicator::Gold => "gold",
            Indicator::YieldSpread => "yield spread",
            Indicator::Dxy => "DXY",
            Indicator::Buffett => "Buffett Indicator",
        })
    }
}
