//! Relationship resolution: from requested fields to join-qualified paths.

use inspectr_proto::{Cardinality, RelationDescriptor, RelationKind};

/// Join-qualified projection for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProjection {
    pub related_name: String,
    pub kind: RelationKind,
    /// How rows aggregate per primary key.
    pub cardinality: Cardinality,
    /// `related_name__field` for each requested field, in request order.
    pub paths: Vec<String>,
}

/// Qualify every param with the descriptor's related name.
///
/// Paths are built the same way for every kind; only the cardinality tag
/// differs.
pub fn resolve(descriptor: &RelationDescriptor, params: &[String]) -> ResolvedProjection {
    ResolvedProjection {
        related_name: descriptor.related_name().to_string(),
        kind: descriptor.kind(),
        cardinality: descriptor.kind().cardinality(),
        paths: params.iter().map(|field| descriptor.qualify(field)).collect(),
    }
}
