//! Structure-file loading: declarative XML patterns compiled into a
//! component graph with restriction predicates, linear-order constraints
//! and core-word determination (spec §4 "Structure loader").

pub mod component;
pub mod order;
pub mod restriction;
pub mod structure;

pub use component::{ChildEdge, Component, ComponentStatus, ComponentType};
pub use order::Order;
pub use restriction::{Combinator, Restriction, RestrictionGroup, SpacePattern};
pub use structure::{build_structures, build_structures_with_options, RepresentationSpec, SyntacticStructure, SystemType};
