use std::fmt;

/// Gateway health classification, one per poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthClassification {
    /// Process running, port open, session authenticated
    Healthy,
    /// Process alive (or unknown) but the API port refuses connections
    PortUnreachable,
    /// Gateway process not running
    ProcessDown,
    /// Port open but the application reports an unauthenticated session
    AuthExpired,
    /// Health endpoint unreachable or returned something unusable
    ProbeError,
}

impl HealthClassification {
    pub const ALL: [HealthClassification; 5] = [
        HealthClassification::Healthy,
        HealthClassification::PortUnreachable,
        HealthClassification::ProcessDown,
        HealthClassification::AuthExpired,
        HealthClassification::ProbeError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthClassification::Healthy => "healthy",
            HealthClassification::PortUnreachable => "port_unreachable",
            HealthClassification::ProcessDown => "process_down",
            HealthClassification::AuthExpired => "auth_expired",
            HealthClassification::ProbeError => "probe_error",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthClassification::Healthy)
    }

    /// Only an expired session can be repaired from here; every other
    /// failure needs the process supervisor or an operator.
    pub fn allows_auto_recovery(&self) -> bool {
        matches!(self, HealthClassification::AuthExpired)
    }
}

impl fmt::Display for HealthClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for HealthClassification {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "healthy" => Ok(HealthClassification::Healthy),
            "port_unreachable" => Ok(HealthClassification::PortUnreachable),
            "process_down" => Ok(HealthClassification::ProcessDown),
            "auth_expired" => Ok(HealthClassification::AuthExpired),
            "probe_error" => Ok(HealthClassification::ProbeError),
            _ => Err(format!("Unknown classification: {}", s)),
        }
    }
}

/// Token held in the single-slot state marker
///
/// `Unknown` is what a first run (or an unreadable marker) reports, so it
/// never matches a real classification and the first observation always
/// counts as a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateToken {
    Unknown,
    Observed(HealthClassification),
}

impl StateToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateToken::Unknown => "unknown",
            StateToken::Observed(c) => c.as_str(),
        }
    }

    /// Parse a persisted token. Anything unrecognised is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("unknown") {
            return Some(StateToken::Unknown);
        }
        HealthClassification::try_from(trimmed)
            .ok()
            .map(StateToken::Observed)
    }

    pub fn classification(&self) -> Option<HealthClassification> {
        match self {
            StateToken::Unknown => None,
            StateToken::Observed(c) => Some(*c),
        }
    }

    /// True when `current` differs from this previously persisted token
    pub fn is_transition_to(&self, current: HealthClassification) -> bool {
        self.classification() != Some(current)
    }
}

impl From<HealthClassification> for StateToken {
    fn from(c: HealthClassification) -> Self {
        StateToken::Observed(c)
    }
}

impl fmt::Display for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State transition event (for logging/debugging)
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: StateToken,
    pub to: HealthClassification,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StateTransition {
    pub fn new(from: StateToken, to: HealthClassification) -> Self {
        Self {
            from,
            to,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_edge(&self) -> bool {
        self.from.is_transition_to(self.to)
    }
}

impl fmt::Display for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
