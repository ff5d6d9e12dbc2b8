pub mod handlers;

use claims_engine::access::{RuleFn, RuleGraph};
use claims_engine::error::GraphError;

use crate::event::{EventKind, GameEvent};

/// Environmental behaviour a claim can switch on. Anything a claim has not
/// enabled is suppressed inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Pvp,
    MobGriefing,
    Explosions,
    FireSpread,
    Pistons,
    Fluids,
}

impl RuleKind {
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Pvp,
        RuleKind::MobGriefing,
        RuleKind::Explosions,
        RuleKind::FireSpread,
        RuleKind::Pistons,
        RuleKind::Fluids,
    ];

    /// Enabled on every new claim.
    pub const DEFAULTS: [RuleKind; 2] = [RuleKind::Pistons, RuleKind::Fluids];

    pub fn identifier(self) -> &'static str {
        match self {
            RuleKind::Pvp => "pvp",
            RuleKind::MobGriefing => "mob_griefing",
            RuleKind::Explosions => "explosions",
            RuleKind::FireSpread => "fire_spread",
            RuleKind::Pistons => "pistons",
            RuleKind::Fluids => "fluids",
        }
    }

    pub fn alias(self) -> &'static str {
        match self {
            RuleKind::Pvp => "combat",
            RuleKind::MobGriefing => "griefing",
            RuleKind::Explosions => "tnt",
            RuleKind::FireSpread => "fire",
            RuleKind::Pistons => "piston",
            RuleKind::Fluids => "water",
        }
    }

    pub fn handlers(self) -> Vec<(EventKind, RuleFn<GameEvent>)> {
        let suppress: RuleFn<GameEvent> = handlers::suppress;
        let event = match self {
            RuleKind::Pvp => EventKind::PlayerDamage,
            RuleKind::MobGriefing => EventKind::MobGrief,
            RuleKind::Explosions => EventKind::Explosion,
            RuleKind::FireSpread => EventKind::FireSpread,
            RuleKind::Pistons => EventKind::PistonPush,
            RuleKind::Fluids => EventKind::FluidFlow,
        };
        vec![(event, suppress)]
    }
}

pub type Rules = RuleGraph<RuleKind, GameEvent>;

/// The standard rule set.
pub fn standard() -> Result<Rules, GraphError> {
    let mut graph = Rules::new();
    for kind in RuleKind::ALL {
        graph.register(kind, kind.identifier(), kind.alias(), None, kind.handlers())?;
    }
    Ok(graph)
}
