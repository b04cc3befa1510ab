use crate::error;
use crate::index;
use crate::provider;
use crate::utils;

/// Converts a provider's raw constituent table into canonical records.
///
/// Stock codes are zero-padded to the exchange's six-digit width, names are
/// mapped onto the canonical short-name field and a missing weight becomes 0.
/// Rows without a stock code cannot be keyed and are dropped.
///
/// # Errors
/// * `OverlapError::Fetch` if the table shape does not belong to `source`.
pub fn normalize(
    raw: provider::RawConstituentTable,
    source: index::IndexSource,
    code: &str,
) -> error::Result<Vec<index::ConstituentRecord>> {
    if raw.source() != source {
        return Err(error::OverlapError::Fetch {
            index_source: source,
            code: code.to_string(),
            cause: format!("provider returned a {} table", raw.source()),
        });
    }

    let records: Vec<index::ConstituentRecord> = match raw {
        provider::RawConstituentTable::Csindex(rows) => rows
            .into_iter()
            .filter_map(|row| canonical(row.stock_code, row.stock_name, row.weight))
            .collect(),
        provider::RawConstituentTable::Cni(rows) => rows
            .into_iter()
            .filter_map(|row| canonical(row.sample_code, row.sample_name, row.weight))
            .collect(),
    };

    Ok(records)
}

fn canonical(stock_code: String, stock_name: String, weight: Option<f64>) -> Option<index::ConstituentRecord> {
    let trimmed = stock_code.trim();
    if trimmed.is_empty() {
        log::warn!("Dropping constituent row without a stock code ({:?})", stock_name);
        return None;
    }

    Some(index::ConstituentRecord {
        stock_code: utils::pad_stock_code(trimmed),
        stock_name,
        weight: weight.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn csindex_rows_are_padded_and_renamed() {
        let raw = provider::RawConstituentTable::Csindex(vec![
            provider::CsindexRow { stock_code: "1".into(), stock_name: "平安银行".into(), weight: Some(0.45) },
            provider::CsindexRow { stock_code: "600519".into(), stock_name: "贵州茅台".into(), weight: None },
        ]);

        let records = normalize(raw, index::IndexSource::Cs, "000300").unwrap();
        assert_eq!(
            records,
            vec![
                index::ConstituentRecord { stock_code: "000001".into(), stock_name: "平安银行".into(), weight: 0.45 },
                index::ConstituentRecord { stock_code: "600519".into(), stock_name: "贵州茅台".into(), weight: 0.0 },
            ]
        );
    }

    #[test]
    fn cni_sample_columns_map_to_canonical_fields() {
        let raw = provider::RawConstituentTable::Cni(vec![provider::CniRow {
            sample_code: "2".into(),
            sample_name: "万科A".into(),
            weight: Some(1.25),
        }]);

        let records = normalize(raw, index::IndexSource::Cni, "399001").unwrap();
        assert_eq!(records[0].stock_code, "000002");
        assert_eq!(records[0].stock_name, "万科A");
        assert_eq!(records[0].weight, 1.25);
    }

    #[test]
    fn blank_codes_are_dropped() {
        let raw = provider::RawConstituentTable::Csindex(vec![provider::CsindexRow {
            stock_code: "  ".into(),
            stock_name: "ghost".into(),
            weight: Some(1.0),
        }]);
        assert!(normalize(raw, index::IndexSource::Cs, "000300").unwrap().is_empty());
    }

    #[test]
    fn mismatched_table_is_a_fetch_error() {
        let raw = provider::RawConstituentTable::Cni(Vec::new());
        let err = normalize(raw, index::IndexSource::Cs, "000300").unwrap_err();
        assert!(matches!(err, error::OverlapError::Fetch { ref code, .. } if code == "000300"));
    }
}
