use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Drift impact level. Variant order is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 4] = [
        SeverityLevel::Low,
        SeverityLevel::Medium,
        SeverityLevel::High,
        SeverityLevel::Critical,
    ];

    /// One step up. Critical saturates.
    pub const fn escalate(self) -> Self {
        match self {
            SeverityLevel::Low => SeverityLevel::Medium,
            SeverityLevel::Medium => SeverityLevel::High,
            SeverityLevel::High | SeverityLevel::Critical => SeverityLevel::Critical,
        }
    }

    /// Base contribution to the risk score.
    pub const fn weight(self) -> u8 {
        match self {
            SeverityLevel::Low => 2,
            SeverityLevel::Medium => 5,
            SeverityLevel::High => 8,
            SeverityLevel::Critical => 10,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
            SeverityLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SeverityLevel::Low),
            "medium" => Ok(SeverityLevel::Medium),
            "high" => Ok(SeverityLevel::High),
            "critical" => Ok(SeverityLevel::Critical),
            other => anyhow::bail!("unknown severity level: {other}"),
        }
    }
}

/// Numeric refinement of severity, always within `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn clamped(raw: u32) -> Self {
        let bounded = raw.clamp(u32::from(Self::MIN), u32::from(Self::MAX));
        Self(u8::try_from(bounded).unwrap_or(Self::MAX))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RiskScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("risk score {value} outside 1..=10"))
        }
    }
}

impl From<RiskScore> for u8 {
    fn from(score: RiskScore) -> Self {
        score.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_totally_ordered() {
        assert!(SeverityLevel::Low < SeverityLevel::Medium);
        assert!(SeverityLevel::Medium < SeverityLevel::High);
        assert!(SeverityLevel::High < SeverityLevel::Critical);
    }

    #[test]
    fn test_escalate_moves_strictly_up_until_critical() {
        for level in SeverityLevel::ALL {
            let escalated = level.escalate();
            if level == SeverityLevel::Critical {
                assert_eq!(escalated, SeverityLevel::Critical);
            } else {
                assert!(escalated > level);
            }
        }
        assert_eq!(SeverityLevel::Low.escalate(), SeverityLevel::Medium);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" High ".parse::<SeverityLevel>().unwrap(), SeverityLevel::High);
        assert_eq!("CRITICAL".parse::<SeverityLevel>().unwrap(), SeverityLevel::Critical);
        assert!("urgent".parse::<SeverityLevel>().is_err());
    }

    #[test]
    fn test_risk_score_clamps_both_ends() {
        assert_eq!(RiskScore::clamped(0).value(), 1);
        assert_eq!(RiskScore::clamped(14).value(), 10);
        assert_eq!(RiskScore::clamped(7).value(), 7);
        assert!(RiskScore::try_from(11).is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&SeverityLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
