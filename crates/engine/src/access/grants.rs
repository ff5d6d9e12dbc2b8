use std::collections::{HashMap, HashSet};

use super::graph::Kind;
use crate::actors::ActorId;
use crate::claims::ClaimId;

/// Trust grants: per-actor permission sets inside a claim, plus each
/// claim's default set for actors without a personal entry.
pub struct GrantTable<K> {
    actors: HashMap<(ClaimId, ActorId), HashSet<K>>,
    defaults: HashMap<ClaimId, HashSet<K>>,
}

impl<K: Kind> GrantTable<K> {
    pub fn new() -> Self {
        Self {
            actors: HashMap::new(),
            defaults: HashMap::new(),
        }
    }

    /// The set that applies to `actor` in `claim`: their personal grants if
    /// they have any, otherwise the claim's defaults.
    pub fn effective(&self, claim: ClaimId, actor: ActorId) -> Option<&HashSet<K>> {
        self.actors
            .get(&(claim, actor))
            .filter(|set| !set.is_empty())
            .or_else(|| self.defaults.get(&claim))
    }

    pub fn actor_grants(&self, claim: ClaimId, actor: ActorId) -> Option<&HashSet<K>> {
        self.actors.get(&(claim, actor))
    }

    pub fn default_grants(&self, claim: ClaimId) -> Option<&HashSet<K>> {
        self.defaults.get(&claim)
    }

    /// Returns true if the grant was new.
    pub fn grant(&mut self, claim: ClaimId, actor: ActorId, kind: K) -> bool {
        self.actors.entry((claim, actor)).or_default().insert(kind)
    }

    pub fn revoke(&mut self, claim: ClaimId, actor: ActorId, kind: K) -> bool {
        let Some(set) = self.actors.get_mut(&(claim, actor)) else {
            return false;
        };
        let removed = set.remove(&kind);
        if set.is_empty() {
            self.actors.remove(&(claim, actor));
        }
        removed
    }

    pub fn grant_default(&mut self, claim: ClaimId, kind: K) -> bool {
        self.defaults.entry(claim).or_default().insert(kind)
    }

    pub fn revoke_default(&mut self, claim: ClaimId, kind: K) -> bool {
        let Some(set) = self.defaults.get_mut(&claim) else {
            return false;
        };
        let removed = set.remove(&kind);
        if set.is_empty() {
            self.defaults.remove(&claim);
        }
        removed
    }

    /// Actors with a personal entry in `claim` (the claim's trust list).
    pub fn trusted_in(&self, claim: ClaimId) -> Vec<ActorId> {
        self.actors
            .keys()
            .filter(|(c, _)| *c == claim)
            .map(|(_, actor)| *actor)
            .collect()
    }

    /// Drop everything about a removed claim.
    pub fn forget_claim(&mut self, claim: ClaimId) {
        self.actors.retain(|(c, _), _| *c != claim);
        self.defaults.remove(&claim);
    }
}

impl<K: Kind> Default for GrantTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which claim-wide rules each claim has switched on.
pub struct RuleTable<K> {
    rules: HashMap<ClaimId, HashSet<K>>,
}

impl<K: Kind> RuleTable<K> {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn has_rule(&self, claim: ClaimId, kind: K) -> bool {
        self.rules.get(&claim).is_some_and(|set| set.contains(&kind))
    }

    pub fn enable(&mut self, claim: ClaimId, kind: K) -> bool {
        self.rules.entry(claim).or_default().insert(kind)
    }

    pub fn disable(&mut self, claim: ClaimId, kind: K) -> bool {
        self.rules.get_mut(&claim).is_some_and(|set| set.remove(&kind))
    }

    pub fn rules_of(&self, claim: ClaimId) -> Option<&HashSet<K>> {
        self.rules.get(&claim)
    }

    pub fn forget_claim(&mut self, claim: ClaimId) {
        self.rules.remove(&claim);
    }
}

impl<K: Kind> Default for RuleTable<K> {
    fn default() -> Self {
        Self::new()
    }
}
