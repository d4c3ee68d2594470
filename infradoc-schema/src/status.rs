use std::{fmt, str::FromStr};

/// Lifecycle status recorded in state documents.
///
/// Documents store the status as a plain string so that an unexpected value
/// surfaces as a validation violation instead of a decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Initialized,
    Applied,
    Destroyed,
}

impl Status {
    /// Every accepted status string.
    pub const ALLOWED: &'static [&'static str] = &["initialized", "applied", "destroyed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Initialized => "initialized",
            Status::Applied => "applied",
            Status::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialized" => Ok(Status::Initialized),
            "applied" => Ok(Status::Applied),
            "destroyed" => Ok(Status::Destroyed),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}
