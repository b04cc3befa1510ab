use crate::error;
use crate::index;

/// One constituent of one index, as needed by the heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEntry {
    pub name: String,
    pub weight: f64,
}

/// Constituents of one index keyed by stock code.
pub type Components = std::collections::BTreeMap<String, ComponentEntry>;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub code: String,
    pub source: index::IndexSource,
    pub component_count: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StockInfo {
    pub code: String,
    pub name: String,
}

/// Dense index × stock weight grid.
///
/// `matrix[row][col]` is the weight of `stocks[col]` in `indices[row]`, 0 when not held.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Heatmap {
    pub indices: Vec<String>,
    pub indices_info: Vec<IndexInfo>,
    pub stocks: Vec<StockInfo>,
    pub matrix: Vec<Vec<f64>>,
}

impl Heatmap {
    #[cfg(test)]
    pub fn stock_codes(&self) -> Vec<&str> {
        self.stocks.iter().map(|stock| stock.code.as_str()).collect()
    }
}

/// Builds the heatmap with a deterministic row and column order.
///
/// Rows are sorted by constituent count (descending), then index code. Name
/// and source break any remaining tie so the order never depends on input
/// order. Columns list the first row's stocks in code order, followed by
/// every other stock in code order.
///
/// # Errors
/// * `OverlapError::Internal` if an index has metadata but no components.
pub fn build_heatmap(
    index_info_by_name: &std::collections::HashMap<String, index::IndexRef>,
    components_by_name: &std::collections::HashMap<String, Components>,
) -> error::Result<Heatmap> {
    let mut rows: Vec<(&index::IndexRef, &Components)> = Vec::with_capacity(index_info_by_name.len());
    for (name, info) in index_info_by_name {
        let components = components_by_name.get(name).ok_or_else(|| {
            error::OverlapError::Internal(format!("No components collected for index {:?}", name))
        })?;
        rows.push((info, components));
    }
    rows.sort_by(|(a_info, a), (b_info, b)| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a_info.code.cmp(&b_info.code))
            .then_with(|| a_info.name.cmp(&b_info.name))
            .then_with(|| a_info.source.cmp(&b_info.source))
    });

    let all_stocks: std::collections::BTreeSet<&String> =
        rows.iter().flat_map(|(_, components)| components.keys()).collect();
    let stock_list: Vec<&String> = match rows.first() {
        Some((_, first)) => first
            .keys()
            .chain(all_stocks.iter().copied().filter(|code| !first.contains_key(*code)))
            .collect(),
        None => all_stocks.into_iter().collect(),
    };

    let matrix: Vec<Vec<f64>> = rows
        .iter()
        .map(|(_, components)| {
            stock_list
                .iter()
                .map(|code| components.get(*code).map_or(0.0, |entry| entry.weight))
                .collect()
        })
        .collect();

    let stocks: Vec<StockInfo> = stock_list
        .iter()
        .map(|code| {
            let name = rows
                .iter()
                .find_map(|(_, components)| components.get(*code))
                .map_or_else(|| code.to_string(), |entry| entry.name.clone());
            StockInfo { code: code.to_string(), name }
        })
        .collect();

    let indices_info: Vec<IndexInfo> = rows
        .iter()
        .map(|(info, components)| IndexInfo {
            name: info.name.clone(),
            code: info.code.clone(),
            source: info.source,
            component_count: components.len(),
        })
        .collect();

    Ok(Heatmap {
        indices: rows.iter().map(|(info, _)| info.name.clone()).collect(),
        indices_info,
        stocks,
        matrix,
    })
}
