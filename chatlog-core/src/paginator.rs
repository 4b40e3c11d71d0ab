use tracing::{debug, info, instrument, warn};

use crate::error::{ExportError, Result};
use crate::model::{Cursor, LogPage};
use crate::source::LogSource;

pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_MAX_PAGES: u32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Records requested per page
    pub page_size: u32,
    /// Hard cap on fetches; hitting it yields a truncated result, not an error
    pub max_pages: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl PageOptions {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ExportError::config("page size must be at least 1"));
        }
        if self.max_pages == 0 {
            return Err(ExportError::config("total pages must be at least 1"));
        }
        Ok(())
    }
}

/// Pull every page matching `filter`, following continuation cursors.
///
/// Pages come back in fetch order. `on_page` is called after each fetch with
/// the 1-based page number. Any source error aborts the whole run.
#[instrument(skip(source, on_page), fields(page_size = options.page_size, max_pages = options.max_pages))]
pub async fn fetch_all<S, F>(
    source: &S,
    filter: &str,
    options: &PageOptions,
    mut on_page: F,
) -> Result<Vec<LogPage>>
where
    S: LogSource + ?Sized,
    F: FnMut(u32, &LogPage),
{
    options.validate()?;

    let mut pages = Vec::new();
    let mut cursor: Option<Cursor> = None;
    let mut page_number: u32 = 1;

    loop {
        info!("Reading page {}.", page_number);
        let page = source
            .fetch_page(filter, cursor.as_ref(), options.page_size)
            .await?;
        debug!(
            page = page_number,
            entries = page.entries.len(),
            has_more = page.next_cursor.is_some(),
            "fetched page"
        );

        on_page(page_number, &page);
        cursor = page.next_cursor.clone();
        pages.push(page);

        if cursor.is_none() {
            break;
        }
        if page_number >= options.max_pages {
            warn!(
                max_pages = options.max_pages,
                "page limit reached before the end of the log collection; result is partial"
            );
            break;
        }
        page_number += 1;
    }

    Ok(pages)
}

/// Total number of entries across all pages.
pub fn count_entries(pages: &[LogPage]) -> usize {
    pages.iter().map(|page| page.entries.len()).sum()
}
