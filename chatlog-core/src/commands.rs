use std::path::Path;

use tracing::{info, instrument};

use crate::error::Result;
use crate::export::{write_raw, write_rows, ExportFormat};
use crate::filter::FilterSource;
use crate::flatten::{flatten, FlattenOptions, Flattened};
use crate::model::LogPage;
use crate::paginator::{count_entries, fetch_all, PageOptions};
use crate::source::LogSource;

/// Everything one export run needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub filter: FilterSource,
    pub pages: PageOptions,
    pub flatten: FlattenOptions,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// File written with this many records
    Written { records: usize },
    /// Nothing matched; tabular formats write no file
    NoRecords,
}

/// Persist fetched pages in `format`.
///
/// Tabular formats are flattened first, so a malformed entry aborts before
/// anything touches `path`. JSON writes the raw pages, including an empty
/// structure when nothing was found.
#[instrument(skip(pages), fields(page_count = pages.len()))]
pub fn cmd_save(
    pages: &[LogPage],
    format: ExportFormat,
    path: &Path,
    options: &FlattenOptions,
) -> Result<SaveOutcome> {
    let records = count_entries(pages);

    if !format.is_tabular() {
        write_raw(path, pages)?;
        info!(records, path = %path.display(), "wrote raw log pages");
        return Ok(if records == 0 {
            SaveOutcome::NoRecords
        } else {
            SaveOutcome::Written { records }
        });
    }

    match flatten(pages, options)? {
        Flattened::NoRecords => Ok(SaveOutcome::NoRecords),
        Flattened::Rows(rows) => {
            write_rows(format, path, &rows)?;
            info!(records = rows.len(), path = %path.display(), %format, "wrote export");
            Ok(SaveOutcome::Written {
                records: rows.len(),
            })
        }
    }
}

/// Fetch every matching page from `source` and save it to `path`.
pub async fn cmd_export<S, F>(
    source: &S,
    request: &ExportRequest,
    path: &Path,
    on_page: F,
) -> Result<SaveOutcome>
where
    S: LogSource + ?Sized,
    F: FnMut(u32, &LogPage),
{
    let filter = request.filter.expression()?;
    let pages = fetch_all(source, &filter, &request.pages, on_page).await?;
    cmd_save(&pages, request.format, path, &request.flatten)
}
