use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::GraphError;

/// A node value in a closed enumeration of permission or rule kinds.
pub trait Kind: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> Kind for T {}

/// One declared kind. `parent` is an index into the graph's node array.
#[derive(Debug, Clone)]
pub struct KindNode<K> {
    pub kind: K,
    pub identifier: &'static str,
    pub alias: &'static str,
    parent: Option<usize>,
}

/// A static forest of kinds, with per-kind handlers keyed by event kind.
///
/// Kinds are declared parents-first and never change after startup. For
/// each event kind the graph keeps the `(kind, handler)` pairs in
/// declaration order, so [`KindGraph::governing`] is a slice walk and the
/// first declared kind has the highest priority.
///
/// Holding a kind satisfies the requirement of that kind and of all of its
/// descendants: [`KindGraph::is_satisfied`] walks from the required kind up
/// through its parents.
pub struct KindGraph<K, E, H> {
    nodes: Vec<KindNode<K>>,
    index: HashMap<K, usize>,
    names: HashMap<&'static str, usize>,
    handlers: HashMap<E, Vec<(usize, H)>>,
}

impl<K: Kind, E: Copy + Eq + Hash, H> KindGraph<K, E, H> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            names: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// Declare a kind with the handlers it owns.
    ///
    /// The parent must already be declared, which also rules out cycles.
    pub fn register(
        &mut self,
        kind: K,
        identifier: &'static str,
        alias: &'static str,
        parent: Option<K>,
        handlers: impl IntoIterator<Item = (E, H)>,
    ) -> Result<(), GraphError> {
        if self.index.contains_key(&kind) {
            return Err(GraphError::Duplicate {
                kind: format!("{kind:?}"),
            });
        }
        let parent = match parent {
            Some(p) => Some(*self.index.get(&p).ok_or_else(|| GraphError::UnknownParent {
                kind: format!("{kind:?}"),
                parent: format!("{p:?}"),
            })?),
            None => None,
        };
        for name in [identifier, alias] {
            if self.names.contains_key(name) {
                return Err(GraphError::NameClash { name: name.to_string() });
            }
        }

        let slot = self.nodes.len();
        self.nodes.push(KindNode {
            kind,
            identifier,
            alias,
            parent,
        });
        self.index.insert(kind, slot);
        self.names.insert(identifier, slot);
        self.names.insert(alias, slot);
        for (event, handler) in handlers {
            self.handlers.entry(event).or_default().push((slot, handler));
        }
        Ok(())
    }

    /// Kinds with a handler for `event`, highest priority first.
    pub fn governing(&self, event: E) -> impl Iterator<Item = K> + '_ {
        self.handlers
            .get(&event)
            .into_iter()
            .flatten()
            .map(|(slot, _)| self.nodes[*slot].kind)
    }

    pub fn first_governing(&self, event: E) -> Option<K> {
        self.governing(event).next()
    }

    pub fn governs(&self, event: E) -> bool {
        self.handlers.get(&event).is_some_and(|list| !list.is_empty())
    }

    pub fn executor_for(&self, event: E, kind: K) -> Option<&H> {
        let slot = *self.index.get(&kind)?;
        self.handlers
            .get(&event)?
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, handler)| handler)
    }

    pub fn parent_of(&self, kind: K) -> Option<K> {
        let slot = *self.index.get(&kind)?;
        self.nodes[slot].parent.map(|p| self.nodes[p].kind)
    }

    /// Parent, grandparent, ... up to the root. Excludes `kind` itself.
    pub fn ancestors(&self, kind: K) -> Ancestors<'_, K> {
        let next = self.index.get(&kind).and_then(|slot| self.nodes[*slot].parent);
        Ancestors { nodes: &self.nodes, next }
    }

    /// Whether holding `held` meets a requirement for `required`.
    pub fn is_satisfied(&self, required: K, held: &HashSet<K>) -> bool {
        held.contains(&required) || self.ancestors(required).any(|k| held.contains(&k))
    }

    pub fn by_identifier(&self, name: &str) -> Option<K> {
        self.names
            .get(name)
            .map(|slot| &self.nodes[*slot])
            .filter(|node| node.identifier == name)
            .map(|node| node.kind)
    }

    /// Look up by identifier or alias (what a player would type).
    pub fn by_name(&self, name: &str) -> Option<K> {
        self.names.get(name).map(|slot| self.nodes[*slot].kind)
    }

    pub fn node(&self, kind: K) -> Option<&KindNode<K>> {
        self.index.get(&kind).map(|slot| &self.nodes[*slot])
    }

    pub fn identifier_of(&self, kind: K) -> Option<&'static str> {
        self.node(kind).map(|node| node.identifier)
    }

    pub fn kinds(&self) -> impl Iterator<Item = K> + '_ {
        self.nodes.iter().map(|node| node.kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<K: Kind, E: Copy + Eq + Hash, H> Default for KindGraph<K, E, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Index-chasing walk towards the root of a kind's tree.
pub struct Ancestors<'a, K> {
    nodes: &'a [KindNode<K>],
    next: Option<usize>,
}

impl<K: Copy> Iterator for Ancestors<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let slot = self.next?;
        let node = &self.nodes[slot];
        self.next = node.parent;
        Some(node.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Perm {
        Build,
        Harvest,
        Replant,
        Container,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Ev {
        Break,
        Open,
        Trample,
    }

    fn graph() -> KindGraph<Perm, Ev, &'static str> {
        let mut g = KindGraph::new();
        g.register(Perm::Build, "build", "b", None, [(Ev::Break, "build-break")])
            .unwrap();
        g.register(
            Perm::Harvest,
            "harvest",
            "h",
            Some(Perm::Build),
            [(Ev::Break, "harvest-break"), (Ev::Trample, "harvest-trample")],
        )
        .unwrap();
        g.register(Perm::Replant, "replant", "r", Some(Perm::Harvest), [])
            .unwrap();
        g.register(Perm::Container, "container", "c", None, [(Ev::Open, "open")])
            .unwrap();
        g
    }

    #[test]
    fn governing_follows_declaration_order() {
        let g = graph();
        let kinds: Vec<_> = g.governing(Ev::Break).collect();
        assert_eq!(kinds, vec![Perm::Build, Perm::Harvest]);
        assert_eq!(g.first_governing(Ev::Trample), Some(Perm::Harvest));
        assert_eq!(g.executor_for(Ev::Break, Perm::Harvest), Some(&"harvest-break"));
        assert_eq!(g.executor_for(Ev::Open, Perm::Build), None);
    }

    #[test]
    fn ancestors_walk_to_the_root() {
        let g = graph();
        let chain: Vec<_> = g.ancestors(Perm::Replant).collect();
        assert_eq!(chain, vec![Perm::Harvest, Perm::Build]);
        assert_eq!(g.parent_of(Perm::Build), None);
        assert_eq!(g.ancestors(Perm::Container).count(), 0);
    }

    #[test]
    fn holding_a_parent_satisfies_descendants() {
        let g = graph();
        let held: HashSet<_> = [Perm::Build].into_iter().collect();
        assert!(g.is_satisfied(Perm::Harvest, &held));
        assert!(g.is_satisfied(Perm::Replant, &held));
        assert!(!g.is_satisfied(Perm::Container, &held));

        let held: HashSet<_> = [Perm::Harvest].into_iter().collect();
        assert!(!g.is_satisfied(Perm::Build, &held));
    }

    #[test]
    fn names_resolve_both_ways() {
        let g = graph();
        assert_eq!(g.by_identifier("harvest"), Some(Perm::Harvest));
        assert_eq!(g.by_identifier("h"), None);
        assert_eq!(g.by_name("h"), Some(Perm::Harvest));
        assert_eq!(g.identifier_of(Perm::Container), Some("container"));
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        let mut g: KindGraph<Perm, Ev, ()> = KindGraph::new();
        assert_eq!(
            g.register(Perm::Harvest, "harvest", "h", Some(Perm::Build), []),
            Err(GraphError::UnknownParent {
                kind: "Harvest".into(),
                parent: "Build".into()
            })
        );
        g.register(Perm::Build, "build", "b", None, []).unwrap();
        assert!(matches!(
            g.register(Perm::Build, "build2", "b2", None, []),
            Err(GraphError::Duplicate { .. })
        ));
        assert!(matches!(
            g.register(Perm::Container, "build", "c", None, []),
            Err(GraphError::NameClash { .. })
        ));
    }
}
