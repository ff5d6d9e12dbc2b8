pub mod handlers;

use claims_engine::access::{PermissionFn, PermissionGraph};
use claims_engine::error::GraphError;

use crate::event::{EventKind, GameEvent};

/// What a claim owner can trust another player with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    Build,
    Harvest,
    Container,
    Display,
    Vehicle,
    Sign,
    Redstone,
    Door,
    Trade,
    Husbandry,
    Detonate,
    Sleep,
}

impl PermissionKind {
    /// Declaration order. Parents come before their children, and for an
    /// event several kinds govern, earlier kinds are consulted first.
    pub const ALL: [PermissionKind; 12] = [
        PermissionKind::Build,
        PermissionKind::Harvest,
        PermissionKind::Container,
        PermissionKind::Display,
        PermissionKind::Vehicle,
        PermissionKind::Sign,
        PermissionKind::Redstone,
        PermissionKind::Door,
        PermissionKind::Trade,
        PermissionKind::Husbandry,
        PermissionKind::Detonate,
        PermissionKind::Sleep,
    ];

    pub fn identifier(self) -> &'static str {
        match self {
            PermissionKind::Build => "build",
            PermissionKind::Harvest => "harvest",
            PermissionKind::Container => "containers",
            PermissionKind::Display => "displays",
            PermissionKind::Vehicle => "vehicles",
            PermissionKind::Sign => "signs",
            PermissionKind::Redstone => "redstone",
            PermissionKind::Door => "doors",
            PermissionKind::Trade => "trade",
            PermissionKind::Husbandry => "husbandry",
            PermissionKind::Detonate => "detonate",
            PermissionKind::Sleep => "sleep",
        }
    }

    pub fn alias(self) -> &'static str {
        match self {
            PermissionKind::Build => "b",
            PermissionKind::Harvest => "farm",
            PermissionKind::Container => "chests",
            PermissionKind::Display => "frames",
            PermissionKind::Vehicle => "boats",
            PermissionKind::Sign => "sign",
            PermissionKind::Redstone => "rs",
            PermissionKind::Door => "door",
            PermissionKind::Trade => "villagers",
            PermissionKind::Husbandry => "animals",
            PermissionKind::Detonate => "tnt",
            PermissionKind::Sleep => "beds",
        }
    }

    pub fn parent(self) -> Option<PermissionKind> {
        match self {
            PermissionKind::Harvest | PermissionKind::Sign | PermissionKind::Detonate => Some(PermissionKind::Build),
            PermissionKind::Display => Some(PermissionKind::Container),
            PermissionKind::Door => Some(PermissionKind::Redstone),
            _ => None,
        }
    }

    /// The events this kind governs and the handler for each.
    pub fn handlers(self) -> Vec<(EventKind, PermissionFn<GameEvent>)> {
        let deny: PermissionFn<GameEvent> = handlers::deny;
        let break_non_crop: PermissionFn<GameEvent> = handlers::break_non_crop;
        let break_crop: PermissionFn<GameEvent> = handlers::break_crop;
        let open_container: PermissionFn<GameEvent> = handlers::open_container;
        let edit_sign: PermissionFn<GameEvent> = handlers::edit_sign;
        let use_redstone: PermissionFn<GameEvent> = handlers::use_redstone;
        let open_door: PermissionFn<GameEvent> = handlers::open_door;

        match self {
            PermissionKind::Build => vec![
                (EventKind::BlockBreak, break_non_crop),
                (EventKind::BlockPlace, deny),
                (EventKind::BucketEmpty, deny),
                (EventKind::BucketFill, deny),
            ],
            PermissionKind::Harvest => vec![(EventKind::BlockBreak, break_crop), (EventKind::FarmlandTrample, deny)],
            PermissionKind::Container => vec![(EventKind::BlockInteract, open_container)],
            PermissionKind::Display => vec![(EventKind::ItemFrameInteract, deny), (EventKind::ArmorStandInteract, deny)],
            PermissionKind::Vehicle => vec![
                (EventKind::VehiclePlace, deny),
                (EventKind::VehicleDestroy, deny),
                (EventKind::VehicleEnter, deny),
            ],
            PermissionKind::Sign => vec![(EventKind::BlockInteract, edit_sign)],
            PermissionKind::Redstone => vec![(EventKind::BlockInteract, use_redstone)],
            PermissionKind::Door => vec![(EventKind::BlockInteract, open_door)],
            PermissionKind::Trade => vec![(EventKind::VillagerTrade, deny)],
            PermissionKind::Husbandry => vec![(EventKind::AnimalDamage, deny), (EventKind::AnimalInteract, deny)],
            PermissionKind::Detonate => vec![(EventKind::TntIgnite, deny)],
            PermissionKind::Sleep => vec![(EventKind::BedEnter, deny)],
        }
    }
}

pub type Permissions = PermissionGraph<PermissionKind, GameEvent>;

/// The standard permission forest.
pub fn standard() -> Result<Permissions, GraphError> {
    let mut graph = Permissions::new();
    for kind in PermissionKind::ALL {
        graph.register(kind, kind.identifier(), kind.alias(), kind.parent(), kind.handlers())?;
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_forest_is_consistent() {
        let graph = standard().unwrap();
        assert_eq!(graph.len(), PermissionKind::ALL.len());
        assert_eq!(graph.by_identifier("containers"), Some(PermissionKind::Container));
        assert_eq!(graph.by_identifier("detonate"), Some(PermissionKind::Detonate));
        assert_eq!(graph.by_identifier("tnt"), None);
        assert_eq!(graph.by_name("tnt"), Some(PermissionKind::Detonate));
        assert_eq!(graph.parent_of(PermissionKind::Door), Some(PermissionKind::Redstone));
    }

    #[test]
    fn block_interactions_are_governed_in_declaration_order() {
        let graph = standard().unwrap();
        let order: Vec<_> = graph.governing(EventKind::BlockInteract).collect();
        assert_eq!(
            order,
            vec![
                PermissionKind::Container,
                PermissionKind::Sign,
                PermissionKind::Redstone,
                PermissionKind::Door
            ]
        );
        assert!(!graph.governs(EventKind::Chat));
    }
}
