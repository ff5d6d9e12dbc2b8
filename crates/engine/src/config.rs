use std::fmt;
use std::str::FromStr;

/// How the rule path treats an event touching several claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleEnforcement {
    /// Stop at the first claim lacking the rule; later claims are never
    /// consulted.
    #[default]
    FirstLacking,
    /// Consult every affected claim and report all that lack the rule.
    AnyLacking,
}

impl FromStr for RuleEnforcement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::FirstLacking),
            "any" => Ok(Self::AnyLacking),
            other => Err(format!("unknown rule mode '{other}' (expected 'first' or 'any')")),
        }
    }
}

impl fmt::Display for RuleEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstLacking => "first",
            Self::AnyLacking => "any",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Chunk radius scanned for border overlays around an observer.
    pub view_radius: u32,
    /// Blocks above and below the observer's feet that get overlays.
    pub y_range: i64,
    pub rule_enforcement: RuleEnforcement,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            view_radius: 10,
            y_range: 25,
            rule_enforcement: RuleEnforcement::FirstLacking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_mode_parses() {
        assert_eq!("first".parse(), Ok(RuleEnforcement::FirstLacking));
        assert_eq!("any".parse(), Ok(RuleEnforcement::AnyLacking));
        assert!("all".parse::<RuleEnforcement>().is_err());
        assert_eq!(RuleEnforcement::AnyLacking.to_string(), "any");
    }
}
