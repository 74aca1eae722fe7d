// Record transformation
//
// Rewrites the image URL cells of each record and leaves every other cell
// untouched, one record at a time.

use crate::clock::{Clock, SystemClock};
use crate::composer::WatermarkComposer;
use crate::models::{CellValue, ColumnSelection, Record};
use crate::timestamp::ParsedTimestamp;
use crate::validation::{extract_url, is_image_url};

/// A record after rewriting
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRecord {
    pub record: Record,

    /// Number of cells that matched the image URL rule
    pub rewritten_cells: usize,
}

/// Applies watermark URLs to records using the selected columns
#[derive(Debug, Clone)]
pub struct RecordTransformer<C = SystemClock> {
    selection: ColumnSelection,
    composer: WatermarkComposer<C>,
}

impl<C: Clock> RecordTransformer<C> {
    pub fn new(selection: ColumnSelection, clock: C) -> Self {
        Self {
            selection,
            composer: WatermarkComposer::new(clock),
        }
    }

    /// Rewrite one record
    pub fn transform(&self, record: &Record) -> Record {
        self.transform_counted(record).record
    }

    /// Rewrite one record and report how many cells were image URLs
    ///
    /// Non-text timestamps take the current-time path. The address cell is
    /// rendered as text, with a missing value becoming an empty address.
    pub fn transform_counted(&self, record: &Record) -> TransformedRecord {
        let timestamp = match record.get(self.selection.time_index) {
            CellValue::Text(raw) => ParsedTimestamp::parse(raw),
            _ => ParsedTimestamp::Unparsable,
        };
        let address = record.get(self.selection.watermark_index).to_string();

        // Built on the first image cell; rows without pictures never touch the clock
        let mut query: Option<String> = None;
        let mut rewritten_cells = 0;

        let cells = record
            .cells
            .iter()
            .map(|cell| match cell {
                CellValue::Text(value) if is_image_url(value) => {
                    rewritten_cells += 1;
                    let suffix = query
                        .get_or_insert_with(|| self.composer.tokens(timestamp, &address).query());
                    CellValue::Text(WatermarkComposer::<C>::apply(extract_url(value), suffix))
                }
                other => other.clone(),
            })
            .collect();

        TransformedRecord {
            record: Record::new(cells),
            rewritten_cells,
        }
    }

    /// Lazily rewrite a sequence of records, passing source errors through
    pub fn transform_all<I, E>(&self, records: I) -> TransformedRecords<'_, I::IntoIter, C>
    where
        I: IntoIterator<Item = Result<Record, E>>,
    {
        TransformedRecords {
            transformer: self,
            inner: records.into_iter(),
        }
    }
}

/// Iterator returned by [`RecordTransformer::transform_all`]
pub struct TransformedRecords<'a, I, C> {
    transformer: &'a RecordTransformer<C>,
    inner: I,
}

impl<'a, I, E, C> Iterator for TransformedRecords<'a, I, C>
where
    I: Iterator<Item = Result<Record, E>>,
    C: Clock,
{
    type Item = Result<TransformedRecord, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.inner.next()?;
        Some(record.map(|record| self.transformer.transform_counted(&record)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
