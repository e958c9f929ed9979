//! Entity handle backed by the sled store and its catalog.

use std::collections::HashMap;
use std::sync::Arc;

use inspectr_proto::{PrimaryKey, Value, FIELD_PATH_SEPARATOR};
use tracing::{debug, instrument};

use super::join::{
    execute_join, EntityRow, JoinGroups, JoinStrategy, PrimaryKeyLookup, HASH_JOIN_CHILD_THRESHOLD,
};
use super::{EntityHandle, ModelMap, RowStream, StoreRow};
use crate::catalog::{Catalog, EntityDef, RelationDef, SchemaBundle};
use crate::error::Error;
use crate::storage::{Record, StorageEngine};

/// Where one requested path reads its value from.
#[derive(Debug, Clone)]
enum PathTarget {
    /// A field of the queried row.
    Local(String),
    /// A field of the related row.
    Related(String),
}

/// Resolved form of a path list against the current schema.
#[derive(Debug)]
struct ProjectionPlan {
    relation: Option<RelationDef>,
    targets: Vec<PathTarget>,
}

/// Requested keys converted to the identity field's type.
struct StoreKeys {
    keys: Vec<PrimaryKey>,
    /// Store key to requested key, for keys the conversion changed.
    requested: HashMap<PrimaryKey, PrimaryKey>,
}

/// A queryable entity of the reference store.
///
/// Paths without a separator read the queried row; `relation__field` follows
/// `relation` as declared from this entity. One projection may follow at
/// most one relation.
///
/// Requested keys are read as the identity field's declared type, so a hex
/// string addresses a UUID-keyed entity. Rows report the key as requested.
pub struct CatalogModel {
    entity: String,
    storage: Arc<StorageEngine>,
    catalog: Arc<Catalog>,
}

impl CatalogModel {
    pub fn new(
        entity: impl Into<String>,
        storage: Arc<StorageEngine>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            entity: entity.into(),
            storage,
            catalog,
        }
    }

    /// Register every catalog entity in `models` under its lowercase name.
    ///
    /// Returns the number of handles registered.
    pub fn register_all(
        models: &mut ModelMap,
        storage: &Arc<StorageEngine>,
        catalog: &Arc<Catalog>,
    ) -> usize {
        let names = catalog.list_entities();
        for name in &names {
            let handle = CatalogModel::new(name.clone(), storage.clone(), catalog.clone());
            models.register(name.to_lowercase(), Arc::new(handle));
        }
        names.len()
    }

    fn store_keys(&self, source: &EntityDef, ids: &[PrimaryKey]) -> Result<StoreKeys, Error> {
        let identity = source.get_identity_field().ok_or_else(|| Error::UnknownField {
            entity: source.name.clone(),
            field: source.identity_field.clone(),
        })?;

        let mut keys = Vec::with_capacity(ids.len());
        let mut requested = HashMap::new();
        for id in ids {
            let key = identity
                .scalar
                .coerce(id.to_value())
                .as_ref()
                .and_then(PrimaryKey::from_value)
                .ok_or_else(|| Error::KeyMismatch {
                    entity: self.entity.clone(),
                    field: identity.name.clone(),
                    key: id.clone(),
                })?;
            if key != *id {
                requested.entry(key.clone()).or_insert_with(|| id.clone());
            }
            keys.push(key);
        }
        Ok(StoreKeys { keys, requested })
    }

    fn plan(&self, schema: &SchemaBundle, paths: &[String]) -> Result<ProjectionPlan, Error> {
        let source = require_entity(schema, &self.entity)?;
        let mut relation: Option<&RelationDef> = None;
        let mut targets = Vec::with_capacity(paths.len());

        for path in paths {
            let Some((relation_name, field)) = path.split_once(FIELD_PATH_SEPARATOR) else {
                require_field(source, path)?;
                targets.push(PathTarget::Local(path.clone()));
                continue;
            };
            if field.contains(FIELD_PATH_SEPARATOR) {
                return Err(Error::InvalidData(format!(
                    "path `{}` on `{}` follows more than one relation",
                    path, self.entity
                )));
            }

            let current = relation;
            let followed = match current {
                Some(existing) if existing.name == relation_name => existing,
                Some(existing) => {
                    return Err(Error::InvalidData(format!(
                        "projection on `{}` follows both `{}` and `{}`",
                        self.entity, existing.name, relation_name
                    )))
                }
                None => {
                    let found = schema.relation_from(&self.entity, relation_name).ok_or_else(|| {
                        Error::UnknownRelation {
                            entity: self.entity.clone(),
                            relation: relation_name.to_string(),
                        }
                    })?;
                    relation = Some(found);
                    found
                }
            };

            let target = require_entity(schema, &followed.to_entity)?;
            require_field(target, field)?;
            targets.push(PathTarget::Related(field.to_string()));
        }

        Ok(ProjectionPlan {
            relation: relation.cloned(),
            targets,
        })
    }

    /// Size estimate for join planning, bounded by the hash-join threshold.
    fn estimate(&self, entity: &str) -> usize {
        self.storage
            .count_entity_up_to(entity, HASH_JOIN_CHILD_THRESHOLD + 1)
    }

    /// Follow `relation` from every parent row.
    fn join(
        &self,
        schema: &SchemaBundle,
        relation: &RelationDef,
        parents: &[(PrimaryKey, Record)],
    ) -> Result<JoinGroups, Error> {
        match &relation.edge_entity {
            None => {
                let keys: Vec<Option<PrimaryKey>> = parents
                    .iter()
                    .map(|(_, record)| {
                        record
                            .get(&relation.from_field)
                            .and_then(PrimaryKey::from_value)
                    })
                    .collect();

                let target = require_entity(schema, &relation.to_entity)?;
                if target.identity_field == relation.to_field {
                    debug!(relation = %relation.name, "joining by primary key lookup");
                    return PrimaryKeyLookup::execute(&self.storage, &keys, &relation.to_entity);
                }

                let strategy = JoinStrategy::select(keys.len(), self.estimate(&relation.to_entity));
                debug!(relation = %relation.name, ?strategy, "joining by scan");
                execute_join(
                    strategy,
                    &self.storage,
                    &keys,
                    &relation.to_entity,
                    &relation.to_field,
                )
            }
            Some(edge_entity) => {
                let keys: Vec<Option<PrimaryKey>> =
                    parents.iter().map(|(pk, _)| Some(pk.clone())).collect();
                let strategy = JoinStrategy::select(keys.len(), self.estimate(edge_entity));
                debug!(relation = %relation.name, edge = %edge_entity, ?strategy, "joining through edge");

                let edges = execute_join(
                    strategy,
                    &self.storage,
                    &keys,
                    edge_entity,
                    &relation.from_field,
                )?;

                // One lookup for every target referenced by any edge, then
                // split back per parent in edge order.
                let target_keys: Vec<Option<PrimaryKey>> = edges
                    .iter()
                    .flatten()
                    .map(|edge| {
                        edge.record
                            .get(&relation.to_field)
                            .and_then(PrimaryKey::from_value)
                    })
                    .collect();
                let mut targets =
                    PrimaryKeyLookup::execute(&self.storage, &target_keys, &relation.to_entity)?
                        .into_iter();

                Ok(edges
                    .iter()
                    .map(|group| {
                        targets
                            .by_ref()
                            .take(group.len())
                            .flatten()
                            .collect::<Vec<_>>()
                    })
                    .collect())
            }
        }
    }
}

impl EntityHandle for CatalogModel {
    fn entity(&self) -> &str {
        &self.entity
    }

    #[instrument(skip_all, fields(entity = %self.entity, ids = ids.len(), paths = paths.len()))]
    fn fetch_projected<'a>(
        &'a self,
        ids: &'a [PrimaryKey],
        paths: &'a [String],
    ) -> Result<RowStream<'a>, Error> {
        let schema = self.catalog.snapshot();
        let StoreKeys { keys, requested } =
            self.store_keys(require_entity(&schema, &self.entity)?, ids)?;
        let ProjectionPlan { relation, targets } = self.plan(&schema, paths)?;
        let parents = self.storage.get_many(&self.entity, &keys)?;

        // None per parent for a local projection.
        let groups: Box<dyn Iterator<Item = Option<Vec<EntityRow>>>> = match &relation {
            Some(relation) => Box::new(self.join(&schema, relation, &parents)?.into_iter().map(Some)),
            None => Box::new(std::iter::repeat_with(|| None)),
        };
        debug!(parents = parents.len(), "projection planned");

        let rows = parents
            .into_iter()
            .zip(groups)
            .flat_map(move |((pk, record), group)| {
                let origin = requested.get(&pk).cloned().unwrap_or(pk);
                project_rows(&targets, paths, origin, &record, group)
            });
        Ok(Box::new(rows.map(Ok)))
    }
}

/// Rows for one parent: one per related record, or a single row when the
/// projection is local or nothing is related.
fn project_rows(
    targets: &[PathTarget],
    paths: &[String],
    origin: PrimaryKey,
    record: &Record,
    group: Option<Vec<EntityRow>>,
) -> Vec<StoreRow> {
    match group {
        None => vec![StoreRow::matched(origin, project(targets, paths, record, None))],
        Some(group) if group.is_empty() => {
            vec![StoreRow::unmatched(origin, project(targets, paths, record, None))]
        }
        Some(group) => group
            .iter()
            .map(|related| {
                StoreRow::matched(
                    origin.clone(),
                    project(targets, paths, record, Some(&related.record)),
                )
            })
            .collect(),
    }
}

fn project(
    targets: &[PathTarget],
    paths: &[String],
    source: &Record,
    related: Option<&Record>,
) -> Vec<(String, Value)> {
    targets
        .iter()
        .zip(paths)
        .map(|(target, path)| {
            let value = match target {
                PathTarget::Local(field) => source.get(field),
                PathTarget::Related(field) => related.and_then(|r| r.get(field)),
            };
            (path.clone(), value.cloned().unwrap_or(Value::Null))
        })
        .collect()
}

fn require_entity<'s>(schema: &'s SchemaBundle, name: &str) -> Result<&'s EntityDef, Error> {
    schema
        .get_entity(name)
        .ok_or_else(|| Error::UnknownEntity(name.to_string()))
}

fn require_field(entity: &EntityDef, field: &str) -> Result<(), Error> {
    if entity.has_field(field) {
        Ok(())
    } else {
        Err(Error::UnknownField {
            entity: entity.name.clone(),
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, ScalarType};
    use crate::model::RecordWriter;
    use crate::storage::StorageConfig;

    struct Fixture {
        storage: Arc<StorageEngine>,
        catalog: Arc<Catalog>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn model(&self, entity: &str) -> CatalogModel {
            CatalogModel::new(entity, self.storage.clone(), self.catalog.clone())
        }

        fn insert(&self, entity: &str, fields: Vec<(&str, Value)>) {
            RecordWriter::new(self.storage.clone(), self.catalog.clone())
                .insert(
                    entity,
                    fields.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
                )
                .unwrap();
        }
    }

    const DEVICE: [u8; 16] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ];
    const DEVICE_HEX: &str = "00112233445566778899aabbccddeeff";

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageEngine::open(StorageConfig::new(dir.path())).unwrap());
        let catalog = Arc::new(Catalog::open(storage.db()).unwrap());

        let schema = SchemaBundle::new(1)
            .with_entity(EntityDef::new("Sensor", "id").with_fields([
                FieldDef::new("id", ScalarType::Int64),
                FieldDef::optional("i_current", ScalarType::Float64),
            ]))
            .with_entity(EntityDef::new("Inverter", "id").with_fields([
                FieldDef::new("id", ScalarType::Int64),
                FieldDef::new("name", ScalarType::String),
                FieldDef::optional("sensor_id", ScalarType::Int64),
            ]))
            .with_entity(EntityDef::new("Device", "id").with_fields([
                FieldDef::new("id", ScalarType::Uuid),
                FieldDef::optional("sensor_id", ScalarType::Int64),
            ]))
            .with_entity(EntityDef::new("Reading", "id").with_fields([
                FieldDef::new("id", ScalarType::Int64),
                FieldDef::new("inverter_id", ScalarType::Int64),
                FieldDef::new("watts", ScalarType::Float64),
            ]))
            .with_entity(EntityDef::new("Tag", "id").with_fields([
                FieldDef::new("id", ScalarType::Int64),
                FieldDef::new("label", ScalarType::String),
            ]))
            .with_entity(EntityDef::new("InverterTag", "id").with_fields([
                FieldDef::new("id", ScalarType::Int64),
                FieldDef::new("inverter_id", ScalarType::Int64),
                FieldDef::new("tag_id", ScalarType::Int64),
            ]))
            .with_relation(RelationDef::many_to_one(
                "sensor", "Inverter", "sensor_id", "Sensor", "id",
            ))
            .with_relation(RelationDef::many_to_one(
                "sensor", "Device", "sensor_id", "Sensor", "id",
            ))
            .with_relation(RelationDef::one_to_many(
                "readings", "Inverter", "id", "Reading", "inverter_id",
            ))
            .with_relation(RelationDef::many_to_many(
                "tags",
                "Inverter",
                "Tag",
                "InverterTag",
                "inverter_id",
                "tag_id",
            ));
        catalog.apply_schema(schema).unwrap();

        let f = Fixture {
            storage,
            catalog,
            _dir: dir,
        };

        f.insert("Sensor", vec![("id", 100.into()), ("i_current", 3.3.into())]);
        f.insert(
            "Inverter",
            vec![("id", 1.into()), ("name", "north".into()), ("sensor_id", 100.into())],
        );
        f.insert("Inverter", vec![("id", 2.into()), ("name", "south".into())]);
        f.insert(
            "Device",
            vec![("id", Value::Uuid(DEVICE)), ("sensor_id", 100.into())],
        );
        f.insert(
            "Reading",
            vec![("id", 10.into()), ("inverter_id", 1.into()), ("watts", 5.0.into())],
        );
        f.insert(
            "Reading",
            vec![("id", 11.into()), ("inverter_id", 1.into()), ("watts", 6.0.into())],
        );
        f.insert("Tag", vec![("id", 7.into()), ("label", "roof".into())]);
        f.insert("Tag", vec![("id", 8.into()), ("label", "grid".into())]);
        f.insert(
            "InverterTag",
            vec![("id", 1.into()), ("inverter_id", 1.into()), ("tag_id", 8.into())],
        );
        f.insert(
            "InverterTag",
            vec![("id", 2.into()), ("inverter_id", 1.into()), ("tag_id", 7.into())],
        );
        f.insert(
            "InverterTag",
            vec![("id", 3.into()), ("inverter_id", 2.into()), ("tag_id", 7.into())],
        );
        f
    }

    fn fetch_keys(
        model: &CatalogModel,
        ids: &[PrimaryKey],
        paths: &[&str],
    ) -> Result<Vec<StoreRow>, Error> {
        let paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        let handle: &dyn EntityHandle = model;
        let rows = handle.filter_by_primary_keys(ids).project(&paths)?;
        rows.collect()
    }

    fn fetch(model: &CatalogModel, ids: &[i64], paths: &[&str]) -> Result<Vec<StoreRow>, Error> {
        let ids: Vec<PrimaryKey> = ids.iter().map(|i| PrimaryKey::Int(*i)).collect();
        fetch_keys(model, &ids, paths)
    }

    #[test]
    fn test_foreign_key_left_outer_join() {
        let f = fixture();
        let rows = fetch(&f.model("Inverter"), &[2, 1], &["sensor__i_current"]).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].origin, PrimaryKey::Int(1));
        assert!(rows[0].matched);
        assert_eq!(rows[0].values, vec![("sensor__i_current".into(), Value::Float64(3.3))]);
        assert_eq!(rows[1].origin, PrimaryKey::Int(2));
        assert!(!rows[1].matched);
        assert_eq!(rows[1].values[0].1, Value::Null);
    }

    #[test]
    fn test_missing_ids_yield_no_rows() {
        let f = fixture();
        let rows = fetch(&f.model("Inverter"), &[42], &["sensor__i_current"]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_local_and_related_paths() {
        let f = fixture();
        let rows = fetch(&f.model("Inverter"), &[1], &["name", "sensor__i_current"]).unwrap();

        assert_eq!(
            rows[0].values,
            vec![
                ("name".into(), Value::String("north".into())),
                ("sensor__i_current".into(), Value::Float64(3.3)),
            ]
        );
    }

    #[test]
    fn test_one_to_many_fans_out() {
        let f = fixture();
        let rows = fetch(&f.model("Inverter"), &[1, 2], &["readings__watts"]).unwrap();

        let watts: Vec<(PrimaryKey, Value)> = rows
            .iter()
            .map(|r| (r.origin.clone(), r.values[0].1.clone()))
            .collect();
        assert_eq!(
            watts,
            vec![
                (PrimaryKey::Int(1), Value::Float64(5.0)),
                (PrimaryKey::Int(1), Value::Float64(6.0)),
                (PrimaryKey::Int(2), Value::Null),
            ]
        );
    }

    #[test]
    fn test_many_to_many_through_edge() {
        let f = fixture();
        let rows = fetch(&f.model("Inverter"), &[1, 2], &["tags__label"]).unwrap();

        let labels: Vec<(PrimaryKey, Value)> = rows
            .iter()
            .map(|r| (r.origin.clone(), r.values[0].1.clone()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (PrimaryKey::Int(1), Value::String("grid".into())),
                (PrimaryKey::Int(1), Value::String("roof".into())),
                (PrimaryKey::Int(2), Value::String("roof".into())),
            ]
        );
    }

    #[test]
    fn test_unknown_relation_and_field() {
        let f = fixture();

        let err = fetch(&f.model("Inverter"), &[1], &["battery__level"]).unwrap_err();
        assert!(matches!(err, Error::UnknownRelation { ref relation, .. } if relation == "battery"));

        let err = fetch(&f.model("Inverter"), &[1], &["sensor__voltage"]).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "voltage"));

        let err = fetch(&f.model("Inverter"), &[1], &["serial"]).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref entity, .. } if entity == "Inverter"));
    }

    #[test]
    fn test_uuid_identity_reads_hex_keys() {
        let f = fixture();
        let requested = PrimaryKey::Str(DEVICE_HEX.into());
        let rows = fetch_keys(&f.model("Device"), &[requested.clone()], &["sensor__i_current"]).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].origin, requested);
        assert!(rows[0].matched);
        assert_eq!(rows[0].values[0].1, Value::Float64(3.3));

        let rows =
            fetch_keys(&f.model("Device"), &[PrimaryKey::Uuid(DEVICE)], &["sensor__i_current"]).unwrap();
        assert_eq!(rows[0].origin, PrimaryKey::Uuid(DEVICE));
    }

    #[test]
    fn test_key_of_wrong_type_is_an_error() {
        let f = fixture();

        let err = fetch_keys(&f.model("Device"), &[PrimaryKey::Str("sensor-1".into())], &["sensor__i_current"])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::KeyMismatch { ref entity, ref key, .. }
                if entity == "Device" && *key == PrimaryKey::Str("sensor-1".into())
        ));

        let err = fetch_keys(&f.model("Inverter"), &[PrimaryKey::Str("1".into())], &["name"]).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_multi_hop_path_rejected() {
        let f = fixture();
        let err = fetch(&f.model("Inverter"), &[1], &["sensor__site__name"]).unwrap_err();
        assert!(matches!(err, Error::InvalidData(ref msg) if msg.contains("more than one relation")));
    }

    #[test]
    fn test_rows_stream_per_parent() {
        let f = fixture();
        let paths = vec!["readings__watts".to_string()];
        let ids = vec![PrimaryKey::Int(1), PrimaryKey::Int(2)];
        let model = f.model("Inverter");
        let handle: &dyn EntityHandle = &model;

        let mut rows = handle.filter_by_primary_keys(&ids).project(&paths).unwrap();
        let first = rows.next().unwrap().unwrap();
        assert_eq!(first.origin, PrimaryKey::Int(1));
        assert_eq!(rows.count(), 2);
    }

    #[test]
    fn test_two_relations_rejected() {
        let f = fixture();
        let err =
            fetch(&f.model("Inverter"), &[1], &["sensor__i_current", "tags__label"]).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_register_all_uses_lowercase_keys() {
        let f = fixture();
        let mut models = ModelMap::new();
        let count = CatalogModel::register_all(&mut models, &f.storage, &f.catalog);

        assert_eq!(count, 6);
        assert_eq!(
            models.keys(),
            vec!["device", "inverter", "invertertag", "reading", "sensor", "tag"]
        );
        assert_eq!(models.get("inverter").unwrap().entity(), "Inverter");
    }
}
