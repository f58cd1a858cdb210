//! Reaction network representation and species-role bookkeeping.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a chemical species in the alphabet.
pub type Species = usize;

/// A reaction of one or two reactants into one or two products.
///
/// An absent second reactant or product is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub reactant_1: Species,
    pub reactant_2: Option<Species>,
    pub product_1: Species,
    pub product_2: Option<Species>,
    pub rate_constant: f64,
}

impl Reaction {
    pub fn new(
        reactants: (Species, Option<Species>),
        products: (Species, Option<Species>),
        rate_constant: f64,
    ) -> Self {
        Self {
            reactant_1: reactants.0,
            reactant_2: reactants.1,
            product_1: products.0,
            product_2: products.1,
            rate_constant,
        }
    }

    /// Reactant species, one entry per slot.
    pub fn reactants(&self) -> impl Iterator<Item = Species> {
        std::iter::once(self.reactant_1).chain(self.reactant_2)
    }

    /// Product species, one entry per slot.
    pub fn products(&self) -> impl Iterator<Item = Species> {
        std::iter::once(self.product_1).chain(self.product_2)
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.reactant_1)?;
        if let Some(r) = self.reactant_2 {
            write!(f, " + S{}", r)?;
        }
        write!(f, " -> S{}", self.product_1)?;
        if let Some(p) = self.product_2 {
            write!(f, " + S{}", p)?;
        }
        write!(f, " (k = {:.4})", self.rate_constant)
    }
}

/// An ordered list of reactions with cached species roles and fitness.
///
/// `sources` holds species that only ever appear as reactants and `sinks`
/// species that only ever appear as products. The two sets are disjoint and
/// are rebuilt after every structural change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "NetworkRecord", into = "NetworkRecord")]
pub struct Network {
    reactions: Vec<Reaction>,
    /// Fitness score, lower is better. `INFINITY` means unscored or unusable.
    pub fitness: f64,
    sources: BTreeSet<Species>,
    sinks: BTreeSet<Species>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            reactions: Vec::new(),
            fitness: f64::INFINITY,
            sources: BTreeSet::new(),
            sinks: BTreeSet::new(),
        }
    }
}

impl Network {
    /// Build a network from a reaction list, keeping at most `capacity` reactions.
    ///
    /// Excess reactions are dropped without error.
    pub fn from_reactions(mut reactions: Vec<Reaction>, fitness: f64, capacity: usize) -> Self {
        reactions.truncate(capacity);
        let mut network = Self {
            reactions,
            fitness,
            sources: BTreeSet::new(),
            sinks: BTreeSet::new(),
        };
        network.update_roles();
        network
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn sources(&self) -> &BTreeSet<Species> {
        &self.sources
    }

    pub fn sinks(&self) -> &BTreeSet<Species> {
        &self.sinks
    }

    pub fn is_source(&self, species: Species) -> bool {
        self.sources.contains(&species)
    }

    pub fn is_sink(&self, species: Species) -> bool {
        self.sinks.contains(&species)
    }

    /// A species is changing when it is neither a fixed source nor a fixed sink.
    pub fn is_changing(&self, species: Species) -> bool {
        !self.is_source(species) && !self.is_sink(species)
    }

    /// Changing species among `0..num_species`.
    pub fn changing_species(&self, num_species: usize) -> impl Iterator<Item = Species> + '_ {
        (0..num_species).filter(move |&s| self.is_changing(s))
    }

    /// Append a reaction unless the network already holds `capacity` reactions.
    pub fn push_reaction(&mut self, reaction: Reaction, capacity: usize) -> bool {
        if self.reactions.len() >= capacity {
            return false;
        }
        self.reactions.push(reaction);
        self.update_roles();
        true
    }

    /// Remove the last reaction. Returns `false` on an empty network.
    pub fn remove_reaction(&mut self) -> bool {
        if self.reactions.pop().is_none() {
            return false;
        }
        self.update_roles();
        true
    }

    /// Mutable access to one reaction's rate constant. Roles are unaffected.
    pub(crate) fn reaction_mut(&mut self, index: usize) -> Option<&mut Reaction> {
        self.reactions.get_mut(index)
    }

    /// Rebuild the source and sink sets from the reaction list.
    fn update_roles(&mut self) {
        let mut sources = BTreeSet::new();
        let mut sinks = BTreeSet::new();

        for reaction in &self.reactions {
            sources.extend(reaction.reactants());
            sinks.extend(reaction.products());
        }

        // Species seen on both sides are changing, not fixed.
        let both: BTreeSet<Species> = sources.intersection(&sinks).copied().collect();
        self.sources = &sources - &both;
        self.sinks = &sinks - &both;
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} reactions, fitness {:.6}",
            self.reactions.len(),
            self.fitness
        )?;
        for reaction in &self.reactions {
            writeln!(f, "  {}", reaction)?;
        }
        Ok(())
    }
}

/// Serialized form of a network; roles are derived again on load.
#[derive(Serialize, Deserialize)]
struct NetworkRecord {
    reactions: Vec<Reaction>,
    #[serde(with = "fitness_serde")]
    fitness: f64,
}

impl From<NetworkRecord> for Network {
    fn from(record: NetworkRecord) -> Self {
        let capacity = record.reactions.len();
        Network::from_reactions(record.reactions, record.fitness, capacity)
    }
}

impl From<Network> for NetworkRecord {
    fn from(network: Network) -> Self {
        Self {
            reactions: network.reactions,
            fitness: network.fitness,
        }
    }
}

/// JSON has no infinity, so unusable fitness is written as `null`.
pub(crate) mod fitness_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
