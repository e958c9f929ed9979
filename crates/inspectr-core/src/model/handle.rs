//! The queryable-store capability the fetcher depends on.

use inspectr_proto::{PrimaryKey, Value};

use crate::error::Error;

/// One row produced by a projection query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    /// Primary key of the queried row this row belongs to.
    pub origin: PrimaryKey,
    /// False when the queried row has no related record (left outer join).
    /// Every relation path of such a row is null.
    pub matched: bool,
    /// Requested path to value, in request order.
    pub values: Vec<(String, Value)>,
}

impl StoreRow {
    /// A row joined to a related record.
    pub fn matched(origin: PrimaryKey, values: Vec<(String, Value)>) -> Self {
        Self {
            origin,
            matched: true,
            values,
        }
    }

    /// A row whose origin has no related record.
    pub fn unmatched(origin: PrimaryKey, values: Vec<(String, Value)>) -> Self {
        Self {
            origin,
            matched: false,
            values,
        }
    }
}

/// Lazily produced rows of one projection query.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<StoreRow, Error>> + 'a>;

/// A handle to one queryable entity.
///
/// Implementors answer a single batched query: "rows whose primary key is in
/// `ids`, projected onto `paths`". Paths use the `relation__field` form.
pub trait EntityHandle: Send + Sync {
    /// Name of the entity behind this handle.
    fn entity(&self) -> &str;

    /// Run the batched projection query.
    fn fetch_projected<'a>(
        &'a self,
        ids: &'a [PrimaryKey],
        paths: &'a [String],
    ) -> Result<RowStream<'a>, Error>;
}

impl<'h> dyn EntityHandle + 'h {
    /// Start a primary-key filtered query.
    pub fn filter_by_primary_keys<'a>(&'a self, ids: &'a [PrimaryKey]) -> PrimaryKeyFilter<'a> {
        PrimaryKeyFilter { handle: self, ids }
    }
}

/// A query restricted to a set of primary keys, awaiting its projection.
pub struct PrimaryKeyFilter<'a> {
    handle: &'a dyn EntityHandle,
    ids: &'a [PrimaryKey],
}

impl<'a> PrimaryKeyFilter<'a> {
    /// Project the selected rows onto `paths` and run the query.
    pub fn project(self, paths: &'a [String]) -> Result<RowStream<'a>, Error> {
        self.handle.fetch_projected(self.ids, paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl EntityHandle for Fixed {
        fn entity(&self) -> &str {
            "Fixed"
        }

        fn fetch_projected<'a>(
            &'a self,
            ids: &'a [PrimaryKey],
            paths: &'a [String],
        ) -> Result<RowStream<'a>, Error> {
            Ok(Box::new(ids.iter().map(move |id| {
                let values = paths
                    .iter()
                    .map(|p| (p.clone(), Value::String(format!("{}", id))))
                    .collect();
                Ok(StoreRow::matched(id.clone(), values))
            })))
        }
    }

    #[test]
    fn test_filter_then_project() {
        let handle: &dyn EntityHandle = &Fixed;
        let ids = vec![PrimaryKey::Int(1), PrimaryKey::Int(2)];
        let paths = vec!["x__y".to_string()];

        let rows: Vec<StoreRow> = handle
            .filter_by_primary_keys(&ids)
            .project(&paths)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.matched));
        assert_eq!(rows[1].values[0].1, Value::String("2".into()));
    }
}
