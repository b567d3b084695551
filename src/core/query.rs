//! Filtering and sorting over records whose fields are only known at runtime.

use crate::domain::model::{is_falsy, QueryConfig, QueryParams, Record, RecordSet, SortDirection};
use crate::utils::error::ApiError;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").expect("static numeric pattern")
});

/// How the per-field matches of a filter are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterOperator {
    /// every filter must match
    #[default]
    And,
    /// at least one filter must match
    Or,
    /// no filter may match
    Not,
}

impl FromStr for FilterOperator {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "AND" => Ok(FilterOperator::And),
            "OR" => Ok(FilterOperator::Or),
            "NOT" => Ok(FilterOperator::Not),
            _ => Err(ApiError::InvalidConfigValue {
                field: "operator".to_string(),
                value: value.to_string(),
                reason: "expected AND, OR or NOT".to_string(),
            }),
        }
    }
}

/// Parse a numeric string (`12`, `-3.5`, `.5`, `1e3`, surrounding spaces allowed).
pub fn parse_numeric(value: &str) -> Option<f64> {
    if !NUMERIC.is_match(value) {
        return None;
    }
    value.trim().parse().ok()
}

/// Loose equality: numeric strings compare by value, anything else byte-wise.
pub fn loose_eq(a: &str, b: &str) -> bool {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Total order on field values: numbers (by value) before other text
/// (lexically).
///
/// Mixed pairs are not compared lexically: numeric-vs-numeric and
/// text-vs-text orders disagree on mixed sets (`"10" < "9"` as text), which
/// would break transitivity, so numbers are ranked ahead of text instead.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Compare two records on `field`; a record without the field ties with
/// everything.
pub fn compare_records(a: &Record, b: &Record, field: &str, direction: SortDirection) -> Ordering {
    let (Some(x), Some(y)) = (a.get(field), b.get(field)) else {
        return Ordering::Equal;
    };
    if loose_eq(x, y) {
        return Ordering::Equal;
    }

    let ordering = compare_values(x, y);
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Every field name that appears on at least one record, in first-seen order.
pub fn query_vars(records: &[Record]) -> IndexSet<String> {
    records
        .iter()
        .flat_map(|record| record.keys())
        .map(str::to_string)
        .collect()
}

/// The filters a request actually applies: non-empty parameters that name a
/// field present in the data.
pub fn effective_filters(records: &[Record], params: &QueryParams) -> IndexMap<String, String> {
    query_vars(records)
        .into_iter()
        .filter_map(|field| {
            let value = params.get(&field)?;
            (!is_falsy(value)).then(|| (field, value.clone()))
        })
        .collect()
}

/// Keep the records matching `filters` under `operator`, in their original order.
pub fn list_filter(
    records: RecordSet,
    filters: &IndexMap<String, String>,
    operator: FilterOperator,
) -> RecordSet {
    if filters.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| {
            let matched = filters
                .iter()
                .filter(|(field, wanted)| record.get(field).is_some_and(|v| loose_eq(v, wanted)))
                .count();

            match operator {
                FilterOperator::And => matched == filters.len(),
                FilterOperator::Or => matched > 0,
                FilterOperator::Not => matched == 0,
            }
        })
        .collect()
}

/// Stable sort on `field`.
///
/// Records lacking the field stay in their slots; the others are ordered
/// among the remaining slots. This keeps the comparator a total order for
/// the standard sort while honouring "missing compares equal".
pub fn sort_records(records: &mut RecordSet, field: &str, direction: SortDirection) {
    let slots: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.contains(field))
        .map(|(idx, _)| idx)
        .collect();

    let mut keyed: Vec<Record> = slots
        .iter()
        .map(|&idx| std::mem::take(&mut records[idx]))
        .collect();
    keyed.sort_by(|a, b| compare_records(a, b, field, direction));

    for (slot, record) in slots.into_iter().zip(keyed) {
        records[slot] = record;
    }
}

/// Apply the request's filters (AND) and optional sort to a parsed source.
pub fn query(records: RecordSet, params: &QueryParams, config: &QueryConfig) -> RecordSet {
    let filters = effective_filters(&records, params);
    let total = records.len();
    let mut records = list_filter(records, &filters, FilterOperator::And);

    tracing::debug!(
        "Filtered {} -> {} records using {} filters",
        total,
        records.len(),
        filters.len()
    );

    if let Some(field) = &config.sort_field {
        tracing::debug!("Sorting on '{}' ({:?})", field, config.sort_direction);
        sort_records(&mut records, field, config.sort_direction);
    }

    records
}
