use crate::index;

/// Snapshot period the CNI constituent tables are pinned to.
///
/// Changing it changes which constituents count as "current"; do not make it
/// a caller option.
pub const CNI_SNAPSHOT_PERIOD: &str = "202508";

/// Index catalogue file name inside each provider directory.
pub const INDEX_LIST_FILE: &str = "index_list.csv";

/// A single row of a China Securities Index constituent table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CsindexRow {
    #[serde(rename = "成分券代码")]
    pub stock_code: String,
    #[serde(rename = "成分券名称", default)]
    pub stock_name: String,
    #[serde(rename = "权重", default)]
    pub weight: Option<f64>,
}

/// A single row of a CNI constituent table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CniRow {
    #[serde(rename = "样本代码")]
    pub sample_code: String,
    #[serde(rename = "样本简称", default)]
    pub sample_name: String,
    #[serde(rename = "权重", default)]
    pub weight: Option<f64>,
}

/// Row of a provider's index catalogue. Both providers share the headers.
#[derive(Debug, Clone, serde::Deserialize)]
struct IndexListRow {
    #[serde(rename = "指数代码")]
    code: String,
    #[serde(rename = "指数简称")]
    short_name: String,
}

/// Raw constituent table as handed back by a provider, one variant per source.
#[derive(Debug, Clone)]
pub enum RawConstituentTable {
    Csindex(Vec<CsindexRow>),
    Cni(Vec<CniRow>),
}

impl RawConstituentTable {
    pub fn source(&self) -> index::IndexSource {
        match self {
            RawConstituentTable::Csindex(_) => index::IndexSource::Cs,
            RawConstituentTable::Cni(_) => index::IndexSource::Cni,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawConstituentTable::Csindex(rows) => rows.len(),
            RawConstituentTable::Cni(rows) => rows.len(),
        }
    }
}

/// External source of index constituent data.
///
/// Implementations are free to block; callers never hold a lock across these calls.
pub trait IndexDataProvider: Send + Sync {
    fn fetch_raw_constituents(
        &self,
        source: index::IndexSource,
        code: &str,
    ) -> anyhow::Result<RawConstituentTable>;

    fn fetch_index_list(&self, source: index::IndexSource) -> anyhow::Result<Vec<index::IndexListing>>;
}

/// Provider backed by exported CSV tables laid out as:
///
/// ```text
/// <root>/cs/<code>.csv
/// <root>/cs/index_list.csv
/// <root>/cni/<code>_202508.csv
/// <root>/cni/index_list.csv
/// ```
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    root: std::path::PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new<P: Into<std::path::PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Path of the constituent table for one index.
    pub fn constituents_path(&self, source: index::IndexSource, code: &str) -> std::path::PathBuf {
        let file_name = match source {
            index::IndexSource::Cs => format!("{}.csv", code),
            index::IndexSource::Cni => format!("{}_{}.csv", code, CNI_SNAPSHOT_PERIOD),
        };
        self.root.join(source.as_str()).join(file_name)
    }

    pub fn index_list_path(&self, source: index::IndexSource) -> std::path::PathBuf {
        self.root.join(source.as_str()).join(INDEX_LIST_FILE)
    }
}

impl IndexDataProvider for CsvDirectoryProvider {
    fn fetch_raw_constituents(
        &self,
        source: index::IndexSource,
        code: &str,
    ) -> anyhow::Result<RawConstituentTable> {
        // Codes end up in a file name.
        if code.is_empty() || code.contains(['/', '\\']) || code.contains("..") {
            return Err(anyhow::anyhow!("Invalid index code: {:?}", code));
        }

        let path = self.constituents_path(source, code);
        let table = match source {
            index::IndexSource::Cs => RawConstituentTable::Csindex(read_rows(&path)?),
            index::IndexSource::Cni => RawConstituentTable::Cni(read_rows(&path)?),
        };
        log::info!("Loaded {} rows from {}", table.len(), path.display());

        anyhow::Ok(table)
    }

    fn fetch_index_list(&self, source: index::IndexSource) -> anyhow::Result<Vec<index::IndexListing>> {
        let path = self.index_list_path(source);
        let rows: Vec<IndexListRow> = read_rows(&path)?;
        let listings = rows
            .into_iter()
            .map(|row| index::IndexListing { code: row.code, short_name: row.short_name })
            .collect();

        anyhow::Ok(listings)
    }
}

/// Deserializes every row of a headed CSV file.
///
/// # Errors
/// * If the file cannot be opened.
/// * If any row fails to deserialize; the error names the file.
fn read_rows<T, P>(path: P) -> anyhow::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<std::path::Path>,
{
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        let row = result.map_err(|e| anyhow::anyhow!("Malformed row in {}: {}", path.display(), e))?;
        rows.push(row);
    }

    anyhow::Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &std::path::Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn reads_csindex_table_ignoring_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "cs/000300.csv",
            "日期,指数代码,成分券代码,成分券名称,交易所,权重\n\
             2025-08-29,000300,1,平安银行,深圳证券交易所,0.45\n\
             2025-08-29,000300,600519,贵州茅台,上海证券交易所,\n",
        );
        let provider = CsvDirectoryProvider::new(dir.path());

        let table = provider.fetch_raw_constituents(index::IndexSource::Cs, "000300").unwrap();
        let RawConstituentTable::Csindex(rows) = table else {
            panic!("expected a csindex table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stock_code, "1");
        assert_eq!(rows[0].weight, Some(0.45));
        assert_eq!(rows[1].stock_name, "贵州茅台");
        assert_eq!(rows[1].weight, None);
    }

    #[test]
    fn cni_tables_are_read_from_the_pinned_period() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "cni/399001_202508.csv",
            "日期,样本代码,样本简称,所属行业,权重\n2025-08-29,2,万科A,房地产,0.3\n",
        );
        let provider = CsvDirectoryProvider::new(dir.path());

        let table = provider.fetch_raw_constituents(index::IndexSource::Cni, "399001").unwrap();
        assert_eq!(table.source(), index::IndexSource::Cni);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDirectoryProvider::new(dir.path());
        let err = provider.fetch_raw_constituents(index::IndexSource::Cs, "000905").unwrap_err();
        assert!(err.to_string().contains("000905.csv"), "{err}");
    }

    #[test]
    fn rejects_codes_that_escape_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDirectoryProvider::new(dir.path());
        assert!(provider.fetch_raw_constituents(index::IndexSource::Cs, "../secret").is_err());
    }

    #[test]
    fn reads_index_list() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cs/index_list.csv", "指数代码,指数简称,发布时间\n000300,沪深300,2005-04-08\n");
        let provider = CsvDirectoryProvider::new(dir.path());

        let listings = provider.fetch_index_list(index::IndexSource::Cs).unwrap();
        assert_eq!(
            listings,
            vec![index::IndexListing { code: "000300".into(), short_name: "沪深300".into() }]
        );
    }
}
