//! Fresh identities for imported elements.

use std::collections::HashMap;

use rand::{Rng, SeedableRng, distr::Alphanumeric, rngs::StdRng};

use netweave_core::identifier::Id;

/// Length of generated identities.
pub const ID_LENGTH: usize = 20;

/// Generates random alphanumeric identities nobody has used yet.
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    /// A generator seeded with `seed`, or from the operating system when
    /// `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// A fresh identity, distinct from every identity interned so far.
    pub fn fresh(&mut self) -> Id {
        loop {
            let text: String = (0..ID_LENGTH)
                .map(|_| self.rng.sample(Alphanumeric) as char)
                .collect();
            if !Id::is_interned(&text) {
                return Id::new(&text);
            }
        }
    }
}

/// Per-instance mapping from source-drawing identities to fresh ones.
///
/// Every instance of a sub-network gets its own table, so two instances of
/// the same drawing never share an identity.
#[derive(Debug, Clone, Default)]
pub struct IdSubstitution {
    table: HashMap<Id, Id>,
}

impl IdSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity standing in for `original`, generating one on first use.
    pub fn substitute(&mut self, original: Id, generator: &mut IdGenerator) -> Id {
        *self
            .table
            .entry(original)
            .or_insert_with(|| generator.fresh())
    }

    pub fn get(&self, original: Id) -> Option<Id> {
        self.table.get(&original).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique_alphanumeric() {
        let mut generator = IdGenerator::new(Some(11));
        let first = generator.fresh().as_string();
        let second = generator.fresh().as_string();

        assert_eq!(first.len(), ID_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_substitution_is_stable_per_table() {
        let mut generator = IdGenerator::new(None);
        let original = Id::new("ident-node");

        let mut first = IdSubstitution::new();
        let mut second = IdSubstitution::new();
        let a = first.substitute(original, &mut generator);
        assert_eq!(first.substitute(original, &mut generator), a);
        assert_eq!(first.get(original), Some(a));
        assert_eq!(first.len(), 1);

        let b = second.substitute(original, &mut generator);
        assert_ne!(a, b);
        assert!(second.get(Id::new("ident-other")).is_none());
    }
}
