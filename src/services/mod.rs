use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{ServiceError, ValidationFailure};

pub mod activity;
pub mod issuance;
pub mod items;
pub mod reports;
pub mod reversal;
pub mod stock_in;

pub use activity::ActivityService;
pub use issuance::IssuanceService;
pub use items::ItemService;
pub use reports::ReportService;
pub use reversal::ReversalService;
pub use stock_in::StockInService;

/// One item/quantity line of a stock-in or issuance batch.
///
/// Typed at the boundary; the engines never see raw dictionary-shaped input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub item_id: i64,
    pub quantity: i32,
}

/// Validates a batch of lines before any storage is touched.
///
/// Returns the distinct item ids in ascending order, which is also the order
/// every engine locks and applies them in. A single bad line rejects the
/// whole batch.
pub(crate) fn validate_batch(lines: &[StockLine]) -> Result<Vec<i64>, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::Validation(ValidationFailure::EmptyBatch));
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for (row, line) in lines.iter().enumerate() {
        let row = row + 1;
        if line.quantity <= 0 {
            return Err(ServiceError::Validation(
                ValidationFailure::NonPositiveQuantity { row },
            ));
        }
        if !seen.insert(line.item_id) {
            return Err(ServiceError::Validation(ValidationFailure::DuplicateItem {
                row,
                item_id: line.item_id,
            }));
        }
    }

    let mut ids: Vec<i64> = seen.into_iter().collect();
    ids.sort_unstable();
    Ok(ids)
}
