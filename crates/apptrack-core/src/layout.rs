//! Section layout and the report fold
//!
//! A section's rows are a pure function of its spec, its counts and the
//! incoming [`ReportCursor`]. The report is a left fold over the catalogue
//! that threads the cursor from one section to the next:
//!
//! ```text
//! (row 2, serial 1) -> Authorize Agent      -> (row 3,  serial 2)
//!                   -> Patient Verification -> (row 7,  serial 3)
//!                   -> Time Slots           -> (row 12, serial 4)
//!                   -> ...
//! ```
//!
//! Only the first row of a section carries the serial number, section name
//! and total hits; the Events and Total Hits columns are merged across all
//! of the section's rows.

use crate::catalogue::SectionSpec;
use crate::{
    CellValue, Column, CountSource, MergeRegion, QueryError, Report, ReportCursor, ReportRow,
    SectionBlock, SectionFill, SuccessCell,
};
use chrono::NaiveDate;
use tracing::info;

/// Lay out one section starting at `cursor`.
///
/// Missing counts are treated as `0`. Returns the block and the cursor
/// advanced past it.
pub fn layout_section(
    spec: &SectionSpec,
    counts: &[i64],
    cursor: ReportCursor,
) -> (SectionBlock, ReportCursor) {
    let serial = cursor.serial_number;
    let first_row = cursor.current_row;
    let count_at = |i: usize| counts.get(i).copied().unwrap_or(0);
    let total_hits: i64 = (0..spec.sub_items.len()).map(count_at).sum();
    let exception = spec.exception.resolve(counts);
    let failure = spec.failure.resolve(counts);

    let rows: Vec<ReportRow> = spec
        .sub_items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let first = i == 0;
            let status = first || spec.status_every_row;
            let pick = |value: &CellValue| {
                if status {
                    value.clone()
                } else {
                    CellValue::Empty
                }
            };
            ReportRow {
                row: first_row + i as u32,
                serial: if first { CellValue::Count(i64::from(serial)) } else { CellValue::Empty },
                event: if first { CellValue::text(spec.name) } else { CellValue::Empty },
                total_hits: if first { CellValue::Count(total_hits) } else { CellValue::Empty },
                success: SuccessCell {
                    label: (!spec.is_single()).then(|| item.label.to_string()),
                    count: count_at(i),
                    pad_width: item.pad_width,
                },
                exception: pick(&exception),
                failure: pick(&failure),
                wrong_hits: match spec.wrong_hits {
                    Some(n) if first => CellValue::Count(n),
                    _ => CellValue::Empty,
                },
                wrong_hit_details: CellValue::Empty,
                remarks: item.remark.map_or(CellValue::Empty, CellValue::text),
            }
        })
        .collect();

    let row_count = rows.len() as u32;
    let mut merges = Vec::new();
    if row_count > 1 {
        let last_row = first_row + row_count - 1;
        let mut merged = vec![Column::Events, Column::TotalHits];
        if spec.merge_status {
            merged.extend([Column::ExceptionReported, Column::Failure]);
        }
        merges.extend(merged.into_iter().map(|column| MergeRegion {
            column,
            first_row,
            last_row,
        }));
    }

    let block = SectionBlock {
        serial,
        name: spec.name.to_string(),
        fill: SectionFill::for_serial(serial),
        total_hits,
        rows,
        merges,
    };
    (block, cursor.advance(row_count))
}

/// Fold the catalogue into a report.
///
/// `counts[i]` holds the sub-item counts for `catalogue[i]`; sections without
/// an entry count as all zeros.
pub fn layout_report(catalogue: &[SectionSpec], counts: &[Vec<i64>], report_date: NaiveDate) -> Report {
    let (sections, cursor) = catalogue.iter().enumerate().fold(
        (Vec::with_capacity(catalogue.len()), ReportCursor::START),
        |(mut sections, cursor), (i, spec)| {
            let section_counts = counts.get(i).map_or(&[][..], Vec::as_slice);
            let (block, next) = layout_section(spec, section_counts, cursor);
            sections.push(block);
            (sections, next)
        },
    );
    Report {
        report_date,
        sections,
        cursor,
    }
}

/// Query every section's counts, in catalogue order, then lay out the report.
///
/// The first failing query aborts the build.
pub async fn build_report(
    source: &dyn CountSource,
    catalogue: &[SectionSpec],
    report_date: NaiveDate,
) -> Result<Report, QueryError> {
    let mut counts = Vec::with_capacity(catalogue.len());
    for spec in catalogue {
        let section_counts = spec.fetch_counts(source).await?;
        info!(
            "{}: total hits {}",
            spec.name,
            section_counts.iter().sum::<i64>()
        );
        counts.push(section_counts);
    }
    Ok(layout_report(catalogue, &counts, report_date))
}
