//! Priority tiers for listener ordering

use tracing::debug;

/// Priority tier of a listener
///
/// Tiers are processed in ascending order during a dispatch. `Delayed` is a
/// distinct variant declared after `Explicit`, so it sorts after every
/// explicit value no matter how large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Explicit(i32),
    Delayed,
}

impl Tier {
    /// Tier used when a registration names neither a priority nor `delayed`
    pub const DEFAULT: Tier = Tier::Explicit(0);

    /// Resolve a registration's tier: explicit value, else delayed, else default
    pub fn resolve(priority: Option<i32>, delayed: bool) -> Self {
        debug!(?priority, delayed, "Tier::resolve: called");
        match (priority, delayed) {
            (Some(value), _) => Tier::Explicit(value),
            (None, true) => Tier::Delayed,
            (None, false) => Tier::DEFAULT,
        }
    }

    pub fn is_delayed(&self) -> bool {
        matches!(self, Tier::Delayed)
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::DEFAULT
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(value) => write!(f, "{}", value),
            Self::Delayed => write!(f, "delayed"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("delayed") {
            return Ok(Self::Delayed);
        }
        trimmed
            .parse::<i32>()
            .map(Self::Explicit)
            .map_err(|_| format!("Unknown tier: {}", s))
    }
}
