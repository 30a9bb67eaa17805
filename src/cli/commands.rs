//! CLI command implementations
//!
//! Every command loads the configuration first, then builds only the
//! pieces it needs: `check` reads one document and its column files,
//! the query commands load the whole registry.

use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{DiskStore, StatisticsCache};
use crate::config::Config;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::persist::{backup_and_write, dataset_id_from_path, read_document};
use crate::registry::{DatasetService, JsonColumnStore, Registry};
use crate::schema::{DefaultOverrides, SchemaValidator};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Outcome of a successful `check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub dataset_id: String,
    pub changed: bool,
    /// Where the previous document was moved, if it was rewritten
    pub backup: Option<PathBuf>,
    pub warnings: Vec<String>,
    pub messages: Vec<String>,
}

/// Run the CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli)
}

/// Run a specific command
pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Check { yaml, defaults } => {
            let outcome = check(&config, &yaml, &defaults)?;
            write_response(serde_json::to_value(&outcome)?)
        }
        Command::Datasets { has_de } => datasets(&config, has_de),
        Command::Meta {
            dataset,
            field,
            raw,
        } => meta(&config, &dataset, &field, raw),
        Command::Aggregate {
            dataset,
            gene,
            meta,
            refresh,
        } => aggregate(&config, &dataset, &gene, &meta, refresh),
        Command::Diffexp {
            dataset,
            category,
            genes,
        } => diffexp(&config, &dataset, &category, &genes),
        Command::CacheRefresh { dataset } => cache_refresh(&config, &dataset),
    }
}

/// Loads the config file and applies command line overrides.
fn resolve_config(cli: &Cli) -> CliResult<Config> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

fn open_cache(config: &Config) -> CliResult<Arc<StatisticsCache>> {
    let store = DiskStore::open(config.cache_path())
        .map_err(|e| CliError::io_error(format!("{}: {}", e.code(), e)))?;
    Ok(Arc::new(StatisticsCache::new(Arc::new(store))))
}

fn open_service(config: &Config) -> CliResult<DatasetService> {
    let data_dir = config.data_path();
    let registry = Registry::load(data_dir)?;
    Ok(DatasetService::new(
        Arc::new(registry),
        Arc::new(JsonColumnStore::new(data_dir)),
        open_cache(config)?,
        config.num_bins,
    ))
}

/// Validates one metadata document and writes it back if it changed.
///
/// The dataset id is the file stem; column files are looked up next to
/// the document. With any problem nothing is written and the call fails.
/// A changed document replaces the file after the previous version has
/// been moved to a backup.
pub fn check(config: &Config, yaml: &Path, defaults: &[String]) -> CliResult<CheckOutcome> {
    let dataset_id = dataset_id_from_path(yaml)?;
    let overrides = DefaultOverrides::parse_pairs(defaults)?;
    let document = read_document(yaml)?;

    let dir = yaml
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let service = DatasetService::new(
        Arc::new(Registry::empty(dir)),
        Arc::new(JsonColumnStore::new(dir)),
        open_cache(config)?,
        config.num_bins,
    );

    log_event_with_fields(
        Event::ValidationStart,
        &[
            ("dataset", dataset_id.as_str()),
            ("path", yaml.display().to_string().as_str()),
        ],
    );

    let validator = SchemaValidator::new(&service, config.classifier_config());
    let report = validator.validate(&dataset_id, &document, &overrides)?;

    for problem in &report.problems {
        log_event_with_fields(
            Event::ValidationProblem,
            &[("dataset", dataset_id.as_str()), ("problem", problem.as_str())],
        );
    }
    if report.has_problems() {
        return Err(CliError::validation_failed(
            &dataset_id,
            report.problems.len(),
        ));
    }

    for warning in &report.warnings {
        log_event_with_fields(
            Event::ValidationWarning,
            &[("dataset", dataset_id.as_str()), ("warning", warning.as_str())],
        );
    }
    for message in &report.messages {
        log_event_with_fields(
            Event::ValidationMessage,
            &[("dataset", dataset_id.as_str()), ("message", message.as_str())],
        );
    }

    let backup = if report.changed {
        let backup = backup_and_write(yaml, &report.document)?;
        if let Some(path) = &backup {
            log_event_with_fields(
                Event::BackupCreated,
                &[
                    ("dataset", dataset_id.as_str()),
                    ("backup", path.display().to_string().as_str()),
                ],
            );
        }
        log_event_with_fields(
            Event::DocumentRewritten,
            &[
                ("dataset", dataset_id.as_str()),
                ("path", yaml.display().to_string().as_str()),
            ],
        );
        backup
    } else {
        log_event_with_fields(Event::DocumentUnchanged, &[("dataset", dataset_id.as_str())]);
        None
    };

    let warnings = report.warnings.len().to_string();
    log_event_with_fields(
        Event::ValidationComplete,
        &[
            ("dataset", dataset_id.as_str()),
            ("changed", if report.changed { "true" } else { "false" }),
            ("warnings", warnings.as_str()),
        ],
    );

    Ok(CheckOutcome {
        dataset_id,
        changed: report.changed,
        backup,
        warnings: report.warnings,
        messages: report.messages,
    })
}

/// `datasets` command: ids and titles of registered datasets.
pub fn datasets(config: &Config, has_de: bool) -> CliResult<()> {
    let registry = Registry::load(config.data_path())?;
    let listing: Vec<Value> = registry
        .datasets(has_de)?
        .into_iter()
        .map(|(id, doc)| {
            json!({
                "id": id,
                "title": doc.get("title").cloned().unwrap_or(Value::Null),
                "diffexp": doc.has_diffexp(),
            })
        })
        .collect();
    write_response(json!({ "datasets": listing }))
}

/// `meta` command: one observation column, labelled unless `raw`.
pub fn meta(config: &Config, dataset: &str, field: &str, raw: bool) -> CliResult<()> {
    let service = open_service(config)?;
    let column = service.get_meta(dataset, field, raw)?;
    write_response(json!({
        "dataset": dataset,
        "field": field,
        "values": column,
    }))
}

/// `aggregate` command: one gene summarised per category of `meta`.
pub fn aggregate(config: &Config, dataset: &str, gene: &str, meta: &str, refresh: bool) -> CliResult<()> {
    let service = open_service(config)?;
    let result = service.gene_meta_agg(dataset, gene, meta, None, refresh)?.ok_or_else(|| {
        CliError::dataset_error(format!("Gene {} not found in dataset {}", gene, dataset))
    })?;
    write_response(json!({
        "dataset": dataset,
        "gene": gene,
        "meta": meta,
        "rows": result,
    }))
}

/// `diffexp` command: DE results of one category for the given genes.
pub fn diffexp(config: &Config, dataset: &str, category: &str, genes: &[String]) -> CliResult<()> {
    let service = open_service(config)?;
    let pivot = service.diffexp(dataset, category, genes)?;
    write_response(json!({
        "dataset": dataset,
        "category": category,
        "results": pivot,
    }))
}

/// `cache-refresh` command: recompute a dataset's column listings.
pub fn cache_refresh(config: &Config, dataset: &str) -> CliResult<()> {
    let service = open_service(config)?;
    let summary = service.refresh_columns(dataset)?;
    write_response(json!({
        "dataset": dataset,
        "columns": summary,
    }))
}
