//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use claims_engine::config::{EngineConfig, RuleEnforcement};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding `claims.json`.
    pub data_dir: PathBuf,
    /// World the claims belong to.
    pub world_id: Uuid,
    pub engine: EngineConfig,
    /// Game tick length. Overlay refreshes run on the tick after they were
    /// requested.
    pub tick: Duration,
    pub dashboard_port: u16,
    /// Most claims one player may own. `None` is unlimited.
    pub claim_limit: Option<usize>,
    /// Most blocks (summed over all their claims) one player may own.
    pub claim_block_limit: Option<i64>,
    pub demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: "claims".into(),
            world_id: default_world_id(),
            engine: EngineConfig::default(),
            tick: Duration::from_millis(50),
            dashboard_port: 8000,
            claim_limit: None,
            claim_block_limit: None,
            demo: false,
        }
    }
}

fn default_world_id() -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, b"world:overworld")
}

/// Value following `flag`, if the flag is present.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter().skip_while(|a| *a != flag).nth(1).cloned()
}

fn parsed<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    flag_value(args, flag)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("invalid value '{}' for {}", v, flag))
        })
        .transpose()
}

impl ServerConfig {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = ServerConfig::default();
        if let Some(dir) = flag_value(args, "--data") {
            config.data_dir = dir.into();
        }
        if let Some(world) = parsed::<Uuid>(args, "--world")? {
            config.world_id = world;
        }
        if let Some(radius) = parsed::<u32>(args, "--view-radius")? {
            config.engine.view_radius = radius;
        }
        if let Some(mode) = parsed::<RuleEnforcement>(args, "--rule-mode")? {
            config.engine.rule_enforcement = mode;
        }
        if let Some(ms) = parsed::<u64>(args, "--tick-ms")? {
            anyhow::ensure!(ms > 0, "--tick-ms must be positive");
            config.tick = Duration::from_millis(ms);
        }
        if let Some(port) = parsed::<u16>(args, "--dashboard-port")? {
            config.dashboard_port = port;
        }
        config.claim_limit = parsed(args, "--claim-limit")?;
        config.claim_block_limit = parsed(args, "--block-limit")?;
        config.demo = args.iter().any(|a| a == "--demo");
        Ok(config)
    }

    pub fn claims_file(&self) -> PathBuf {
        self.data_dir.join("claims.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_flags() {
        let config = ServerConfig::from_args(&args(&["claims-server"])).unwrap();
        assert_eq!(config.engine.view_radius, 10);
        assert_eq!(config.engine.rule_enforcement, RuleEnforcement::FirstLacking);
        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.claim_limit, None);
        assert!(!config.demo);
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::from_args(&args(&[
            "claims-server",
            "--rule-mode",
            "any",
            "--view-radius",
            "4",
            "--claim-limit",
            "3",
            "--data",
            "/tmp/claims",
            "--demo",
        ]))
        .unwrap();
        assert_eq!(config.engine.rule_enforcement, RuleEnforcement::AnyLacking);
        assert_eq!(config.engine.view_radius, 4);
        assert_eq!(config.claim_limit, Some(3));
        assert_eq!(config.claims_file(), PathBuf::from("/tmp/claims/claims.json"));
        assert!(config.demo);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(ServerConfig::from_args(&args(&["x", "--rule-mode", "all"])).is_err());
        assert!(ServerConfig::from_args(&args(&["x", "--tick-ms", "0"])).is_err());
        assert!(ServerConfig::from_args(&args(&["x", "--dashboard-port", "huge"])).is_err());
    }
}
