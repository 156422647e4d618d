//! Knowledge-graph model and snapshot loading

pub mod model;
pub mod store;

pub use model::{
    Entity, GraphSnapshot, Observation, ObservationSignature, Relation, RichObservation,
    TRUST_RELATION_WEIGHTS, trust_weight,
};
pub use store::GraphStore;
