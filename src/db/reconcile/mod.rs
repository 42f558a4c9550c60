use crate::db::error::CacheError;
use crate::db::table::core::row::{Row, RowHandle, RowState, TrackedRow};
use crate::db::table::core::table::Table;
use crate::db::table::core::value::Record;
use crate::store::{BackingStore, StoreError, StoreOperation};

/// Outcome of one [`reconcile`] pass.
///
/// Store failures are reported here rather than returned as an error, so the
/// caller can see how far the pass got. Calling [`reconcile`] again resumes at
/// the failed row since everything before it is no longer pending.
#[derive(Debug)]
pub struct ReconciliationResult {
    pub reconciled: usize,
    /// Index into the pending changes of the operation that failed.
    pub failed_at: Option<usize>,
    pub error: Option<StoreError>,
    /// Store answers that could not be written back, by pending index. The
    /// store already applied these operations, so their rows are settled
    /// anyway and count as reconciled.
    pub write_back_errors: Vec<(usize, StoreError)>,
}

impl ReconciliationResult {
    pub fn is_success(&self) -> bool {
        self.failed_at.is_none()
    }
}

/// One pending row and the store operation derived for it.
#[derive(Debug, PartialEq, Clone)]
pub struct PlannedOperation {
    pub handle: RowHandle,
    pub state: RowState,
    /// `None` when a Modified row ended up equal to its original; it is
    /// settled locally without a store call.
    pub operation: Option<StoreOperation>,
}

/// Derives the store operations for every pending change, in reconcile order.
///
/// Fails before anything is dispatched if a row cannot be addressed: the
/// table has no primary key, a persisted row has a key cell whose store value
/// is unknown, or an added row leaves a key column that the store does not
/// generate unset.
pub fn plan(table: &Table) -> Result<Vec<PlannedOperation>, CacheError> {
    let mut pending = table.pending_changes().peekable();
    if pending.peek().is_some() && !table.schema().has_primary_key() {
        return Err(CacheError::schema(format!(
            "Table `{}` has pending changes but no primary key to address them",
            table.name()
        )));
    }
    pending
        .map(|(row, state)| {
            check_key(table, row, state)?;
            Ok(PlannedOperation {
                handle: row.handle(),
                state,
                operation: derive_operation(table, row, state),
            })
        })
        .collect()
}

fn check_key(table: &Table, row: &TrackedRow, state: RowState) -> Result<(), CacheError> {
    let columns = table.schema().columns();
    for &index in table.schema().primary_key() {
        let column = &columns[index];
        let unknown = match state {
            RowState::Added => row.current()[index].is_absent() && !column.generated,
            RowState::Deleted | RowState::Modified => store_image(row)[index].is_absent(),
            RowState::Unchanged => false,
        };
        if unknown {
            return Err(CacheError::schema(format!(
                "{} has no value for key column `{}`",
                row.handle(),
                column.name
            )));
        }
    }
    Ok(())
}

fn derive_operation(table: &Table, row: &TrackedRow, state: RowState) -> Option<StoreOperation> {
    match state {
        RowState::Deleted => Some(StoreOperation::Delete {
            key: table.key_of(store_image(row)),
        }),
        RowState::Modified => {
            let changed = row.changed_columns();
            if changed.is_empty() {
                return None;
            }
            let columns = table.schema().columns();
            Some(StoreOperation::Update {
                key: table.key_of(store_image(row)),
                changes: changed
                    .into_iter()
                    .map(|i| (columns[i].name.clone(), row.current()[i].clone()))
                    .collect(),
            })
        }
        RowState::Added => Some(StoreOperation::Insert {
            values: table
                .row_to_record(row.current())
                .into_iter()
                .filter(|(_, value)| !value.is_absent())
                .collect(),
        }),
        RowState::Unchanged => None,
    }
}

/// The values the store is known to hold for `row`.
fn store_image(row: &TrackedRow) -> &Row {
    row.original().unwrap_or(row.current())
}

/// Applies the table's pending changes to `store`, one operation per row, and
/// stops at the first failure.
///
/// This is not transactional: operations that succeeded before a failure stay
/// applied in the store and the matching rows are already settled in the
/// table. Wrap the call in a store transaction if all-or-nothing is needed.
pub fn reconcile<S>(table: &mut Table, store: &mut S) -> Result<ReconciliationResult, CacheError>
where
    S: BackingStore + ?Sized,
{
    let planned = plan(table)?;
    let total = planned.len();
    let mut reconciled = 0;
    let mut write_back_errors = Vec::new();

    for (index, step) in planned.iter().enumerate() {
        let generated = match &step.operation {
            Some(operation) => {
                tracing::debug!(table = %table.name(), index, %operation, "dispatching");
                operation.apply(store)
            }
            None => Ok(None),
        };
        match generated {
            Ok(generated) => {
                for error in settle(table, step, generated) {
                    tracing::warn!(
                        table = %table.name(),
                        index,
                        error = %error,
                        "store answer not written back"
                    );
                    write_back_errors.push((index, error));
                }
                reconciled += 1;
            }
            Err(error) => {
                tracing::warn!(
                    table = %table.name(),
                    index,
                    reconciled,
                    error = %error,
                    "reconcile stopped"
                );
                return Ok(ReconciliationResult {
                    reconciled,
                    failed_at: Some(index),
                    error: Some(error),
                    write_back_errors,
                });
            }
        }
    }

    tracing::info!(table = %table.name(), reconciled, total, "reconcile complete");
    Ok(ReconciliationResult {
        reconciled,
        failed_at: None,
        error: None,
        write_back_errors,
    })
}

/// Moves a row to its post-reconcile state once the store accepted it.
///
/// Generated key parts that do not fit the schema are skipped and returned;
/// the row is settled regardless since the store already holds it. Cells the
/// insert left out stay `Absent` in both images.
fn settle(
    table: &mut Table,
    step: &PlannedOperation,
    generated: Option<Record>,
) -> Vec<StoreError> {
    if step.state == RowState::Deleted {
        table.remove(step.handle);
        return Vec::new();
    }

    let mut errors = Vec::new();
    let mut assignments = Vec::new();
    for (column, value) in generated.into_iter().flatten() {
        let resolved = table
            .schema()
            .get_index_of_column(&column)
            .and_then(|index| table.schema().columns()[index].check(&value).map(|_| index));
        match resolved {
            Ok(index) => assignments.push((index, value)),
            Err(e) => errors.push(StoreError::Decode {
                column,
                message: e.to_string(),
            }),
        }
    }

    if let Some(row) = table.entry_mut(step.handle) {
        for (index, value) in assignments {
            row.current_mut()[index] = value;
        }
        row.accept();
    }
    errors
}
