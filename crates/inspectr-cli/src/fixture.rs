//! JSON fixtures: a schema plus the rows to load into the store.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use inspectr_core::catalog::{Catalog, EntityDef, FieldDef, RelationDef, ScalarType, SchemaBundle};
use inspectr_core::RecordWriter;
use serde::Deserialize;
use tracing::info;

/// Top-level fixture document.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub entities: Vec<EntityFixture>,
    #[serde(default)]
    pub relations: Vec<RelationFixture>,
    /// Entity name to rows.
    #[serde(default)]
    pub rows: BTreeMap<String, Vec<serde_json::Map<String, serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityFixture {
    pub name: String,
    #[serde(default = "default_identity")]
    pub identity: String,
    pub fields: Vec<FieldFixture>,
}

fn default_identity() -> String {
    "id".to_string()
}

#[derive(Debug, Deserialize)]
pub struct FieldFixture {
    pub name: String,
    #[serde(rename = "type")]
    pub scalar: FieldType,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
    Timestamp,
    Uuid,
}

impl From<FieldType> for ScalarType {
    fn from(ty: FieldType) -> Self {
        match ty {
            FieldType::Bool => ScalarType::Bool,
            FieldType::Int32 => ScalarType::Int32,
            FieldType::Int64 => ScalarType::Int64,
            FieldType::Float32 => ScalarType::Float32,
            FieldType::Float64 => ScalarType::Float64,
            FieldType::String => ScalarType::String,
            FieldType::Bytes => ScalarType::Bytes,
            FieldType::Timestamp => ScalarType::Timestamp,
            FieldType::Uuid => ScalarType::Uuid,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationCardinality {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

/// A relation declared from `from`.
///
/// For `many_to_many`, `edge` names the edge entity and `from_field` /
/// `to_field` are its columns.
#[derive(Debug, Deserialize)]
pub struct RelationFixture {
    pub name: String,
    pub from: String,
    pub to: String,
    pub cardinality: RelationCardinality,
    pub from_field: String,
    pub to_field: String,
    #[serde(default)]
    pub edge: Option<String>,
}

impl RelationFixture {
    fn to_def(&self) -> anyhow::Result<RelationDef> {
        let def = match self.cardinality {
            RelationCardinality::ManyToOne => RelationDef::many_to_one(
                &self.name,
                &self.from,
                &self.from_field,
                &self.to,
                &self.to_field,
            ),
            RelationCardinality::OneToOne => RelationDef::one_to_one(
                &self.name,
                &self.from,
                &self.from_field,
                &self.to,
                &self.to_field,
            ),
            RelationCardinality::OneToMany => RelationDef::one_to_many(
                &self.name,
                &self.from,
                &self.from_field,
                &self.to,
                &self.to_field,
            ),
            RelationCardinality::ManyToMany => {
                let edge = self.edge.as_deref().with_context(|| {
                    format!("many_to_many relation `{}` needs an `edge` entity", self.name)
                })?;
                RelationDef::many_to_many(
                    &self.name,
                    &self.from,
                    &self.to,
                    edge,
                    &self.from_field,
                    &self.to_field,
                )
            }
        };
        Ok(def)
    }
}

impl Fixture {
    /// Read a fixture file.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// Build the schema bundle described by the fixture.
    pub fn schema(&self) -> anyhow::Result<SchemaBundle> {
        let mut bundle = SchemaBundle::new(1);
        for entity in &self.entities {
            let fields = entity.fields.iter().map(|f| {
                if f.nullable {
                    FieldDef::optional(&f.name, f.scalar.into())
                } else {
                    FieldDef::new(&f.name, f.scalar.into())
                }
            });
            bundle = bundle.with_entity(EntityDef::new(&entity.name, &entity.identity).with_fields(fields));
        }
        for relation in &self.relations {
            bundle = bundle.with_relation(relation.to_def()?);
        }
        Ok(bundle)
    }

    /// Apply the schema and write every row. Returns the number of rows written.
    pub fn load(&self, catalog: &Catalog, writer: &RecordWriter) -> anyhow::Result<usize> {
        let version = catalog.apply_schema(self.schema()?)?;
        info!(version, entities = self.entities.len(), "schema applied");

        let mut written = 0;
        for (entity, rows) in &self.rows {
            for (i, row) in rows.iter().enumerate() {
                writer
                    .insert_json(entity, row)
                    .with_context(|| format!("loading {} row {}", entity, i))?;
                written += 1;
            }
        }
        writer.flush()?;

        info!(rows = written, "fixture loaded");
        Ok(written)
    }
}
