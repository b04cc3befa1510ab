use crate::cache;
use crate::error;
use crate::heatmap;
use crate::index;
use crate::overlap;
use crate::progress;
use crate::utils;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

/// Overlap matrices for the selected indices, in request order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OverlapResponse {
    pub names: Vec<String>,
    #[serde(flatten)]
    pub matrices: overlap::OverlapMatrices,
    pub timestamp: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HeatmapResponse {
    #[serde(flatten)]
    pub heatmap: heatmap::Heatmap,
    pub timestamp: String,
}

/// Operations offered to the front end, all backed by one shared cache.
pub struct OverlapService {
    cache: std::sync::Arc<cache::ConstituentCache>,
    show_progress: bool,
}

impl OverlapService {
    pub fn new(cache: std::sync::Arc<cache::ConstituentCache>) -> Self {
        Self { cache, show_progress: false }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cache(&self) -> &cache::ConstituentCache {
        &self.cache
    }

    /// Index catalogue of one provider.
    pub fn list_indices(&self, source: &str) -> error::Result<std::sync::Arc<Vec<index::IndexListing>>> {
        let source: index::IndexSource = required("source", source)?.parse()?;
        self.cache.index_list(source)
    }

    /// Canonical constituents of one index.
    ///
    /// # Errors
    /// * `Validation` if `code` or `source` is blank.
    /// * `UnsupportedSource` if `source` is not a known provider.
    /// * `Fetch` if the provider fails.
    pub fn get_components(&self, code: &str, source: &str) -> error::Result<cache::Constituents> {
        let code = required("code", code)?;
        let source: index::IndexSource = required("source", source)?.parse()?;
        self.cache.get_or_fetch(source, code)
    }

    /// Pairwise overlap of at least two indices.
    pub fn get_overlap(&self, indices: &[index::IndexRef]) -> error::Result<OverlapResponse> {
        let indices = validate_selection(indices, 2)?;
        let resolved = self.resolve(&indices)?;

        let mut stocks_by_index = overlap::StocksByIndex::new();
        let mut weights_by_index = overlap::WeightsByIndex::new();
        for (selection, records) in indices.iter().zip(&resolved) {
            let stocks = stocks_by_index.entry(selection.name.clone()).or_default();
            let weights = weights_by_index.entry(selection.name.clone()).or_default();
            for record in records.iter() {
                stocks.insert(record.stock_code.clone());
                weights.insert(record.stock_code.clone(), record.weight);
            }
        }

        let names: Vec<String> = indices.iter().map(|selection| selection.name.clone()).collect();
        let matrices = overlap::compute_overlap(&stocks_by_index, &weights_by_index, &names)?;

        Ok(OverlapResponse { names, matrices, timestamp: utils::now_timestamp() })
    }

    /// Per-index, per-stock weight grid of at least one index.
    pub fn get_heatmap(&self, indices: &[index::IndexRef]) -> error::Result<HeatmapResponse> {
        let indices = validate_selection(indices, 1)?;
        let resolved = self.resolve(&indices)?;

        let mut info_by_name = std::collections::HashMap::new();
        let mut components_by_name = std::collections::HashMap::new();
        for (selection, records) in indices.iter().zip(&resolved) {
            let components: heatmap::Components = records
                .iter()
                .map(|record| {
                    let entry = heatmap::ComponentEntry { name: record.stock_name.clone(), weight: record.weight };
                    (record.stock_code.clone(), entry)
                })
                .collect();
            info_by_name.insert(selection.name.clone(), selection.clone());
            components_by_name.insert(selection.name.clone(), components);
        }

        let heatmap = heatmap::build_heatmap(&info_by_name, &components_by_name)?;
        Ok(HeatmapResponse { heatmap, timestamp: utils::now_timestamp() })
    }

    /// Resolves every selection through the cache, in selection order.
    fn resolve(&self, indices: &[index::IndexRef]) -> error::Result<Vec<cache::Constituents>> {
        let start = std::time::Instant::now();
        let bar = progress::fetch_progress(indices.len(), self.show_progress);

        let resolved = indices
            .par_iter()
            .progress_with(bar.clone())
            .map(|selection| self.cache.get_or_fetch(selection.source, &selection.code))
            .collect::<error::Result<Vec<_>>>();
        bar.finish_and_clear();

        let resolved = resolved?;
        log::debug!(
            "Resolved {} indices in {:.3}s ({} cached)",
            indices.len(),
            start.elapsed().as_secs_f64(),
            self.cache.len()
        );
        Ok(resolved)
    }
}

fn required<'a>(field: &str, value: &'a str) -> error::Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(error::OverlapError::Validation(format!("missing required parameter `{}`", field)));
    }
    Ok(value)
}

/// Checks the selection size, blank codes and name uniqueness.
///
/// Returns the selection with codes and names trimmed; a blank name falls back to the code.
fn validate_selection(indices: &[index::IndexRef], min: usize) -> error::Result<Vec<index::IndexRef>> {
    if indices.len() < min {
        let noun = if min == 1 { "index" } else { "indices" };
        return Err(error::OverlapError::Validation(format!(
            "select at least {} {} (got {})",
            min,
            noun,
            indices.len()
        )));
    }

    let mut seen = std::collections::HashSet::new();
    let mut validated = Vec::with_capacity(indices.len());
    for selection in indices {
        let code = required("code", &selection.code)?;
        let name = match selection.name.trim() {
            "" => code,
            name => name,
        };
        if !seen.insert(name) {
            return Err(error::OverlapError::Validation(format!(
                "index name {:?} selected more than once",
                name
            )));
        }
        validated.push(index::IndexRef { code: code.to_string(), name: name.to_string(), source: selection.source });
    }
    Ok(validated)
}
