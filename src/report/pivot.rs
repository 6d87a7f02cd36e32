use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::analyzers::utility::label_order;
use crate::records::TestRecord;
use crate::report::sheet::{Cell, Sheet};

/// Aggregate placed in each (date, site) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotValue {
    MaxDownload,
    MaxUpload,
    Count,
}

impl PivotValue {
    fn aggregate(self, tests: &[&TestRecord]) -> Cell {
        let max = |rates: Vec<f64>| rates.into_iter().reduce(f64::max);
        match self {
            PivotValue::MaxDownload => max(tests.iter().filter_map(|t| t.dn_br).collect()).into(),
            PivotValue::MaxUpload => max(tests.iter().filter_map(|t| t.up_br).collect()).into(),
            PivotValue::Count => Cell::count(tests.len()),
        }
    }
}

/// Dates down, site codes across, one aggregate per cell.
///
/// Cells with no tests stay blank.
pub fn pivot_table(name: impl Into<String>, tests: &[TestRecord], value: PivotValue) -> Sheet {
    let mut cells: BTreeMap<NaiveDate, BTreeMap<&str, Vec<&TestRecord>>> = BTreeMap::new();
    let mut codes: BTreeSet<&str> = BTreeSet::new();

    for t in tests {
        let Some(code) = t.site_code.as_deref() else {
            continue;
        };
        let date = t.date.unwrap_or_else(|| t.timestamp.date());
        codes.insert(code);
        cells
            .entry(date)
            .or_default()
            .entry(code)
            .or_default()
            .push(t);
    }

    let mut codes: Vec<&str> = codes.into_iter().collect();
    codes.sort_by_key(|c| label_order(c));

    let mut sheet = Sheet::new(name, std::iter::once("date").chain(codes.iter().copied()));
    for (date, by_site) in cells {
        let mut row = Vec::with_capacity(codes.len() + 1);
        row.push(Cell::date(date));
        for code in &codes {
            row.push(
                by_site
                    .get(code)
                    .map(|group| value.aggregate(group))
                    .unwrap_or(Cell::Empty),
            );
        }
        sheet.push_row(row);
    }
    sheet
}
