//! Dataset service
//!
//! Combines the registry, column storage, statistics cache and aggregation
//! engine into the queries the serving layer and the validator need.
//! Column listings are memoized; they are invariant for as long as a
//! dataset's column files are.

use serde::Serialize;
use std::sync::Arc;

use crate::aggregate::{aggregate, bin, AggregationResult};
use crate::cache::StatisticsCache;
use crate::classify::{DeFieldSet, RawSeries};
use crate::schema::{Dtype, ObservationSource, SchemaError, SchemaResult};

use super::columns::ColumnSource;
use super::diffexp::DiffExpPivot;
use super::errors::{RegistryError, RegistryResult};
use super::registry::Registry;

/// Cache operation names.
const OP_GENES: &str = "genes";
const OP_OBS_FIELDS: &str = "obs_fields";
const OP_VAR_FIELDS: &str = "var_fields";
const OP_GENE_META_AGG: &str = "gene_meta_agg";

/// One observation column as served.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaColumn {
    /// Cells as stored
    Raw(RawSeries),
    /// Stringified categories or bin labels
    Labels(Vec<Option<String>>),
}

impl MetaColumn {
    /// Category label per row; missing cells are `None`.
    pub fn to_labels(&self) -> Vec<Option<String>> {
        match self {
            MetaColumn::Raw(series) => series.to_labels(),
            MetaColumn::Labels(labels) => labels.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetaColumn::Raw(series) => series.len(),
            MetaColumn::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sizes of the column listings after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub genes: usize,
    pub obs_fields: usize,
    pub var_fields: usize,
}

/// Dataset queries over injected registry, storage and cache.
pub struct DatasetService {
    registry: Arc<Registry>,
    columns: Arc<dyn ColumnSource>,
    cache: Arc<StatisticsCache>,
    num_bins: usize,
}

impl DatasetService {
    pub fn new(
        registry: Arc<Registry>,
        columns: Arc<dyn ColumnSource>,
        cache: Arc<StatisticsCache>,
        num_bins: usize,
    ) -> Self {
        Self {
            registry,
            columns,
            cache,
            num_bins,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &StatisticsCache {
        &self.cache
    }

    /// Measurement (gene) column names.
    pub fn genes(&self, dataset_id: &str, refresh: bool) -> RegistryResult<Vec<String>> {
        self.cache
            .get_or_compute(OP_GENES, &self.listing_args(dataset_id), refresh, || {
                self.columns.measurement_columns(dataset_id)
            })
    }

    /// Observation field names.
    pub fn obs_fields(&self, dataset_id: &str, refresh: bool) -> RegistryResult<Vec<String>> {
        self.cache
            .get_or_compute(OP_OBS_FIELDS, &self.listing_args(dataset_id), refresh, || {
                self.columns.obs_columns(dataset_id)
            })
    }

    /// Distinct field names of the DE table.
    pub fn var_fields(&self, dataset_id: &str, refresh: bool) -> RegistryResult<Vec<String>> {
        self.cache
            .get_or_compute(OP_VAR_FIELDS, &self.listing_args(dataset_id), refresh, || {
                Ok(self.columns.diffexp_table(dataset_id)?.distinct_fields())
            })
    }

    /// Base names of DE fields with log-fold-change results.
    pub fn de_fields(&self, dataset_id: &str) -> RegistryResult<DeFieldSet> {
        Ok(DeFieldSet::from_measurement_fields(self.var_fields(dataset_id, false)?))
    }

    /// Recomputes every cached column listing for a dataset.
    pub fn refresh_columns(&self, dataset_id: &str) -> RegistryResult<ColumnSummary> {
        Ok(ColumnSummary {
            genes: self.genes(dataset_id, true)?.len(),
            obs_fields: self.obs_fields(dataset_id, true)?.len(),
            var_fields: self.var_fields(dataset_id, true)?.len(),
        })
    }

    /// One observation column.
    ///
    /// With `raw` the stored cells come back untouched. Otherwise the
    /// document's dtype decides: categorical fields are stringified,
    /// numerical fields are binned, anything else is returned raw.
    pub fn get_meta(&self, dataset_id: &str, field: &str, raw: bool) -> RegistryResult<MetaColumn> {
        let series = self.columns.obs_column(dataset_id, field)?;
        if raw {
            return Ok(MetaColumn::Raw(series));
        }

        match self.field_dtype(dataset_id, field)? {
            Some(Dtype::Categorical) => Ok(MetaColumn::Labels(series.to_labels())),
            Some(Dtype::Numerical) => {
                let binned = bin(&series.to_numbers(), self.num_bins)?;
                Ok(MetaColumn::Labels(binned.labels))
            }
            Some(Dtype::Skip) | None => Ok(MetaColumn::Raw(series)),
        }
    }

    /// Summary of one gene per category of one observation field.
    ///
    /// Returns `None` if the dataset has no such gene. With `refresh` the
    /// summary is recomputed and the cached one replaced.
    pub fn gene_meta_agg(
        &self,
        dataset_id: &str,
        gene: &str,
        meta: &str,
        order: Option<&[String]>,
        refresh: bool,
    ) -> RegistryResult<Option<AggregationResult>> {
        let dtype = self.field_dtype(dataset_id, meta)?.map(|d| d.as_str());
        let location = self.columns.location();
        let args = (location, dataset_id, gene, meta, dtype, self.num_bins, order);

        self.cache
            .get_or_compute(OP_GENE_META_AGG, &args, refresh, || {
                let Some(values) = self.columns.measurement_column(dataset_id, gene)? else {
                    return Ok(None);
                };
                let categories = self.get_meta(dataset_id, meta, false)?.to_labels();
                Ok(Some(aggregate(&values, &categories, order)?))
            })
    }

    /// DE categories declared by the dataset document.
    pub fn diffexp_categories(&self, dataset_id: &str) -> RegistryResult<Vec<String>> {
        Ok(self.registry.get(dataset_id)?.diffexp_categories())
    }

    /// DE results of one category, pivoted `value -> measurement -> gene`.
    ///
    /// # Errors
    ///
    /// `UnknownDiffExpCategory` if the document does not declare `category`.
    pub fn diffexp(&self, dataset_id: &str, category: &str, genes: &[String]) -> RegistryResult<DiffExpPivot> {
        let categories = self.diffexp_categories(dataset_id)?;
        if !categories.iter().any(|c| c == category) {
            return Err(RegistryError::UnknownDiffExpCategory {
                dataset: dataset_id.to_string(),
                category: category.to_string(),
            });
        }
        self.columns
            .diffexp_table(dataset_id)?
            .pivot(dataset_id, category, genes)
    }

    /// Cache arguments of a column listing: storage location and dataset.
    fn listing_args(&self, dataset_id: &str) -> (String, String) {
        (self.columns.location(), dataset_id.to_string())
    }

    fn field_dtype(&self, dataset_id: &str, field: &str) -> RegistryResult<Option<Dtype>> {
        let document = self.registry.get(dataset_id)?;
        Ok(document.field_descriptor(field).and_then(|d| d.dtype))
    }
}

impl ObservationSource for DatasetService {
    fn known_obs_fields(&self, dataset_id: &str) -> SchemaResult<Vec<String>> {
        self.obs_fields(dataset_id, false)
            .map_err(|e| SchemaError::source_unavailable(dataset_id, e))
    }

    fn raw_obs_values(&self, dataset_id: &str, field: &str) -> SchemaResult<RawSeries> {
        self.columns
            .obs_column(dataset_id, field)
            .map_err(|e| SchemaError::source_unavailable(dataset_id, e))
    }

    fn de_field_names(&self, dataset_id: &str) -> SchemaResult<DeFieldSet> {
        self.de_fields(dataset_id)
            .map_err(|e| SchemaError::source_unavailable(dataset_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::registry::{DiffExpTable, MemoryColumnStore};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        columns: Arc<MemoryColumnStore>,
        service: DatasetService,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("ds.yaml"),
            "author: A\n\
             diffexp:\n  celltype: {}\n\
             obs_meta:\n  celltype:\n    name: celltype\n    dtype: categorical\n  \
             age:\n    name: age\n    dtype: numerical\n",
        )
        .unwrap();
        let registry = Arc::new(Registry::load(temp.path()).unwrap());

        let columns = MemoryColumnStore::new();
        columns.insert_obs("ds", "celltype", vec![json!("T"), json!("B"), json!("T"), json!(null)]);
        columns.insert_obs("ds", "age", vec![json!(20), json!(30), json!(40), json!(50)]);
        columns.insert_measurement("ds", "CD3E", vec![json!(1.0), json!(0.0), json!(3.0), json!(9.0)]);

        let mut genes = BTreeMap::new();
        genes.insert("CD3E".to_string(), vec![Some(2.5), Some(-1.0)]);
        columns.insert_diffexp(
            "ds",
            DiffExpTable::new(
                vec!["celltype__T__lfc".to_string(), "celltype__B__lfc".to_string()],
                genes,
            ),
        );

        let columns = Arc::new(columns);
        let cache = Arc::new(StatisticsCache::new(Arc::new(MemoryStore::new())));
        let service = DatasetService::new(registry, columns.clone(), cache, 2);
        Fixture {
            _temp: temp,
            columns,
            service,
        }
    }

    #[test]
    fn test_column_listings_are_cached() {
        let f = fixture();
        assert_eq!(f.service.obs_fields("ds", false).unwrap(), vec!["age", "celltype"]);
        assert_eq!(f.service.obs_fields("ds", false).unwrap(), vec!["age", "celltype"]);
        assert_eq!(f.service.cache().stats().hits, 1);
    }

    #[test]
    fn test_get_meta_by_dtype() {
        let f = fixture();
        let categorical = f.service.get_meta("ds", "celltype", false).unwrap();
        assert_eq!(
            categorical,
            MetaColumn::Labels(vec![Some("T".into()), Some("B".into()), Some("T".into()), None])
        );

        let binned = f.service.get_meta("ds", "age", false).unwrap().to_labels();
        assert!(binned[0].as_deref().unwrap().starts_with("01 "));
        assert!(binned[3].as_deref().unwrap().starts_with("02 "));

        let raw = f.service.get_meta("ds", "age", true).unwrap();
        assert!(matches!(raw, MetaColumn::Raw(_)));
    }

    #[test]
    fn test_gene_meta_agg() {
        let f = fixture();
        let result = f
            .service
            .gene_meta_agg("ds", "CD3E", "celltype", None, false)
            .unwrap()
            .unwrap();
        assert_eq!(result.categories(), vec!["B", "T"]);
        assert_eq!(result.get("T").unwrap().mean, Some(2.0));

        assert!(f
            .service
            .gene_meta_agg("ds", "NOPE", "celltype", None, false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_gene_meta_agg_refresh_recomputes() {
        let f = fixture();
        let mean_t = |refresh| {
            f.service
                .gene_meta_agg("ds", "CD3E", "celltype", None, refresh)
                .unwrap()
                .unwrap()
                .get("T")
                .unwrap()
                .mean
        };
        assert_eq!(mean_t(false), Some(2.0));

        f.columns
            .insert_measurement("ds", "CD3E", vec![json!(3.0), json!(0.0), json!(5.0), json!(9.0)]);
        assert_eq!(mean_t(false), Some(2.0));
        assert_eq!(mean_t(true), Some(4.0));
        assert_eq!(mean_t(false), Some(4.0));
    }

    #[test]
    fn test_listings_are_keyed_by_storage_location() {
        let f = fixture();
        let other = MemoryColumnStore::new();
        other.insert_obs("ds", "batch", vec![json!("x")]);
        let second = DatasetService::new(
            f.service.registry.clone(),
            Arc::new(other),
            f.service.cache.clone(),
            2,
        );

        assert_eq!(f.service.obs_fields("ds", false).unwrap(), vec!["age", "celltype"]);
        assert_eq!(second.obs_fields("ds", false).unwrap(), vec!["batch"]);
        assert_eq!(f.service.cache().stats().hits, 0);
    }

    #[test]
    fn test_de_fields_from_var_table() {
        let f = fixture();
        let de = f.service.de_fields("ds").unwrap();
        assert!(de.contains("celltype__T"));
        assert!(de.contains("celltype__B"));
    }

    #[test]
    fn test_diffexp_unknown_category() {
        let f = fixture();
        let err = f.service.diffexp("ds", "condition", &[]).unwrap_err();
        assert_eq!(err.code(), "OBSMETA_UNKNOWN_DIFFEXP_CATEGORY");

        let pivot = f.service.diffexp("ds", "celltype", &["CD3E".to_string()]).unwrap();
        assert_eq!(pivot["T"]["lfc"]["CD3E"], Some(2.5));
    }

    #[test]
    fn test_unknown_dataset() {
        let f = fixture();
        assert!(matches!(
            f.service.diffexp_categories("ghost"),
            Err(RegistryError::DatasetNotFound(_))
        ));
    }

    #[test]
    fn test_observation_source_maps_errors() {
        let f = fixture();
        let err = f.service.raw_obs_values("ds", "missing").unwrap_err();
        assert_eq!(err.dataset_id(), Some("ds"));
    }
}
