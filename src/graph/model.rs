//! Knowledge-graph data model
//!
//! Entities, observations and relations as stored in the shared KV by the
//! upstream enumeration tools. Everything here is read-only for the oracle;
//! a snapshot is immutable for the lifetime of a request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relation labels that carry trust, with their propagation weights.
pub const TRUST_RELATION_WEIGHTS: [(&str, f64); 8] = [
    ("trusts", 1.0),
    ("endorsed_by", 0.9),
    ("verified_by", 0.9),
    ("collaborates_with", 0.7),
    ("depends_on", 0.6),
    ("implements", 0.6),
    ("built", 0.8),
    ("uses", 0.5),
];

/// Weight for a trust-typed relation label, `None` for non-trust labels.
pub fn trust_weight(label: &str) -> Option<f64> {
    TRUST_RELATION_WEIGHTS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, w)| *w)
}

/// A named node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl Entity {
    /// Texts of observations active at `now`, in stored order.
    pub fn active_observation_texts(&self, now: DateTime<Utc>) -> Vec<&str> {
        self.observations
            .iter()
            .filter(|o| o.is_active(now))
            .map(|o| o.text())
            .collect()
    }

    /// Count of observations active at `now`.
    pub fn active_observation_count(&self, now: DateTime<Utc>) -> usize {
        self.observations.iter().filter(|o| o.is_active(now)).count()
    }

    /// Count of observations carrying a non-empty signature.
    pub fn signed_observation_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_signed()).count()
    }
}

/// An observation attached to an entity.
///
/// The wire shape is either a plain string or a record; anything else is
/// absorbed by the trailing variant so one malformed observation never fails
/// the whole entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Plain(String),
    Rich(RichObservation),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichObservation {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signature: Option<ObservationSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSignature {
    #[serde(default)]
    pub signature_hex: Option<String>,
    #[serde(default)]
    pub signer: Option<String>,
}

impl Observation {
    /// The observation text; empty for unrecognized shapes.
    pub fn text(&self) -> &str {
        match self {
            Observation::Plain(s) => s,
            Observation::Rich(rich) => rich
                .text
                .as_deref()
                .or(rich.observation.as_deref())
                .unwrap_or(""),
            Observation::Other(_) => "",
        }
    }

    /// Active iff there is no expiry, or the expiry is strictly after `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self {
            Observation::Rich(rich) => match rich.expires_at {
                Some(expires) => expires > now,
                None => true,
            },
            _ => true,
        }
    }

    /// Signed iff a non-empty `signature_hex` is present.
    pub fn is_signed(&self) -> bool {
        match self {
            Observation::Rich(rich) => rich
                .signature
                .as_ref()
                .and_then(|s| s.signature_hex.as_deref())
                .is_some_and(|hex| !hex.is_empty()),
            _ => false,
        }
    }
}

/// A labeled directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub relation: String,
}

impl Relation {
    pub fn is_trust_typed(&self) -> bool {
        trust_weight(&self.relation).is_some()
    }
}

/// Whole-graph snapshot read atomically from the shared KV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl GraphSnapshot {
    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Relations touching `name` on either side, across all labels.
    pub fn total_relations(&self, name: &str) -> usize {
        self.relations
            .iter()
            .filter(|r| r.source == name || r.target == name)
            .count()
    }

    /// Inbound trust-typed relations (entity as target).
    pub fn trust_relations_in(&self, name: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.target == name && r.is_trust_typed())
            .collect()
    }

    /// Outbound trust-typed relations (entity as source).
    pub fn trust_relations_out(&self, name: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.source == name && r.is_trust_typed())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entity(name: &str, observations: Vec<Observation>) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: "agent".to_string(),
            created: Utc::now(),
            updated: None,
            observations,
        }
    }

    #[test]
    fn test_trust_weight_table() {
        assert_eq!(trust_weight("trusts"), Some(1.0));
        assert_eq!(trust_weight("uses"), Some(0.5));
        assert_eq!(trust_weight("mentions"), None);
    }

    #[test]
    fn test_observation_shapes_deserialize() {
        let raw = r#"[
            "plain note",
            {"text": "rich note", "expires_at": "2031-01-01T00:00:00Z"},
            {"observation": "alias field", "signature": {"signature_hex": "ab12"}},
            42
        ]"#;
        let observations: Vec<Observation> = serde_json::from_str(raw).unwrap();
        assert_eq!(observations[0].text(), "plain note");
        assert_eq!(observations[1].text(), "rich note");
        assert_eq!(observations[2].text(), "alias field");
        assert!(observations[2].is_signed());
        assert_eq!(observations[3].text(), "");
        assert!(observations[3].is_active(Utc::now()));
    }

    #[test]
    fn test_expired_observation_is_inactive() {
        let now = Utc::now();
        let expired = Observation::Rich(RichObservation {
            text: Some("old".to_string()),
            observation: None,
            expires_at: Some(now - Duration::hours(1)),
            signature: None,
        });
        let boundary = Observation::Rich(RichObservation {
            text: Some("edge".to_string()),
            observation: None,
            expires_at: Some(now),
            signature: None,
        });
        assert!(!expired.is_active(now));
        // Expiry must be strictly after the evaluation instant.
        assert!(!boundary.is_active(now));
    }

    #[test]
    fn test_empty_signature_hex_is_unsigned() {
        let obs = Observation::Rich(RichObservation {
            text: Some("note".to_string()),
            observation: None,
            expires_at: None,
            signature: Some(ObservationSignature {
                signature_hex: Some(String::new()),
                signer: None,
            }),
        });
        assert!(!obs.is_signed());
    }

    #[test]
    fn test_snapshot_relation_queries() {
        let snapshot = GraphSnapshot {
            entities: vec![entity("a", vec![]), entity("b", vec![])],
            relations: vec![
                Relation {
                    source: "a".to_string(),
                    target: "b".to_string(),
                    relation: "trusts".to_string(),
                },
                Relation {
                    source: "b".to_string(),
                    target: "a".to_string(),
                    relation: "mentions".to_string(),
                },
            ],
        };
        assert_eq!(snapshot.total_relations("a"), 2);
        assert_eq!(snapshot.trust_relations_out("a").len(), 1);
        assert_eq!(snapshot.trust_relations_in("b").len(), 1);
        assert!(snapshot.trust_relations_in("a").is_empty());
    }
}
