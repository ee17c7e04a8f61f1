// ── Name registry ──
//
// One flat namespace per configuration submission. Ports, devices,
// protocol layers, flows and captures all share it, so a flow endpoint can
// be resolved by name alone. A registry never outlives the submission it
// was built for.

use std::collections::{HashMap, HashSet};

use tgbridge_api::EntityKind;

use crate::error::DuplicateName;
use crate::model::explicit_name;

#[derive(Debug, Default)]
pub struct NameRegistry {
    names: HashMap<String, EntityKind>,
    /// Explicit names found up front; generated names must avoid them even
    /// if the entity claiming one is visited later.
    reserved: HashSet<String>,
    counters: HashMap<EntityKind, u32>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose generated names skip every name in `reserved`.
    pub fn with_reserved<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved: reserved.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Claim `name` for an entity of `kind`.
    ///
    /// Matching is exact and case-sensitive.
    pub fn register(&mut self, name: &str, kind: EntityKind) -> Result<(), DuplicateName> {
        if let Some(existing) = self.names.get(name) {
            return Err(DuplicateName {
                name: name.to_owned(),
                kind,
                existing: *existing,
            });
        }
        self.names.insert(name.to_owned(), kind);
        Ok(())
    }

    /// Next free `{kind}-{n}` name. Counters run per kind from 1.
    pub fn generate(&mut self, kind: EntityKind) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{kind}-{counter}");
            if !self.reserved.contains(&candidate) && !self.names.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Register the entity's explicit name, or a generated one if it has
    /// none, and return the name it ended up with.
    pub fn assign(
        &mut self,
        name: Option<&String>,
        kind: EntityKind,
    ) -> Result<String, DuplicateName> {
        let name = match explicit_name(name) {
            Some(explicit) => explicit.to_owned(),
            None => self.generate(kind),
        };
        self.register(&name, kind)?;
        Ok(name)
    }

    /// Kind an existing name was registered as.
    pub fn lookup(&self, name: &str) -> Option<EntityKind> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
