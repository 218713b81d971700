//! Optimistic row commands.
//!
//! A [`RowCommand`] is applied to the local collection first, then written
//! to the store. The [`Applied`] record it leaves behind either confirms the
//! local change with the stored row or reverts it.

use std::time::Duration;

use touchline_core::error::CoreError;
use touchline_core::feed::SyncRow;
use touchline_core::types::RowId;

use crate::backend::RowWriter;
use crate::error::SyncError;
use crate::reconcile::LocalRow;
use crate::retry::with_timeout;

/// A user edit to one row of a feed.
pub enum RowCommand<R: SyncRow> {
    Insert(R),
    Update { id: RowId, patch: R::Patch },
    Delete(RowId),
}

impl<R: SyncRow> RowCommand<R> {
    pub fn row_id(&self) -> RowId {
        match self {
            Self::Insert(row) => row.row_id(),
            Self::Update { id, .. } | Self::Delete(id) => *id,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update { .. } => "update",
            Self::Delete(_) => "delete",
        }
    }

    /// Apply the command to `rows` and record how to undo it.
    ///
    /// Inserted and patched rows are validated first; an invalid edit
    /// leaves `rows` untouched.
    pub fn apply_local(&self, rows: &mut Vec<LocalRow<R>>) -> Result<Applied<R>, SyncError> {
        let id = self.row_id();
        let position = rows.iter().position(|l| l.id() == id);

        match (self, position) {
            (Self::Insert(_), Some(_)) => Err(CoreError::Conflict(format!(
                "Row {id} already exists in {}",
                R::TABLE
            ))
            .into()),
            (Self::Insert(row), None) => {
                row.validate()?;
                let mut local = LocalRow::new(row.clone());
                local.flags.pending = true;
                rows.push(local);
                Ok(Applied::Inserted(id))
            }
            (Self::Update { patch, .. }, Some(index)) => {
                let mut patched = rows[index].row.clone();
                patched.apply_patch(patch);
                patched.validate()?;
                let local = &mut rows[index];
                let previous = local.clone();
                local.row = patched.clone();
                local.flags.pending = true;
                Ok(Applied::Updated { previous, patched })
            }
            (Self::Delete(_), Some(index)) => {
                let row = rows.remove(index);
                Ok(Applied::Deleted { index, row })
            }
            (Self::Update { .. } | Self::Delete(_), None) => Err(CoreError::NotFound {
                entity: R::TABLE,
                id: id.to_string(),
            }
            .into()),
        }
    }

    /// Write the command to the store, bounded by `after`.
    ///
    /// Returns the stored row, or `None` for deletes.
    pub async fn send(
        self,
        writer: &dyn RowWriter<R>,
        after: Duration,
    ) -> Result<Option<R>, SyncError> {
        let operation = self.operation();
        match self {
            Self::Insert(row) => with_timeout(operation, after, writer.insert(row))
                .await
                .map(Some),
            Self::Update { id, patch } => with_timeout(operation, after, writer.update(id, patch))
                .await
                .map(Some),
            Self::Delete(id) => with_timeout(operation, after, writer.delete(id))
                .await
                .map(|()| None),
        }
    }
}

/// The local effect of a command, kept until the write settles.
#[derive(Debug)]
pub enum Applied<R> {
    Inserted(RowId),
    /// The row before the patch and the optimistic row it became.
    Updated { previous: LocalRow<R>, patched: R },
    Deleted { index: usize, row: LocalRow<R> },
}

impl<R: SyncRow> Applied<R> {
    /// Undo the local change after a failed write.
    ///
    /// A refresh may have replaced the collection in the meantime, so rows
    /// are located by id rather than by position. An updated row is only
    /// rolled back while it still holds the optimistic patch; newer fetched
    /// content is kept.
    pub fn revert(self, rows: &mut Vec<LocalRow<R>>) {
        match self {
            Self::Inserted(id) => rows.retain(|l| l.id() != id),
            Self::Updated { previous, patched } => {
                if let Some(local) = rows.iter_mut().find(|l| l.id() == previous.id()) {
                    if local.row == patched {
                        local.row = previous.row;
                    }
                    local.flags.pending = previous.flags.pending;
                }
            }
            Self::Deleted { index, row } => {
                if !rows.iter().any(|l| l.id() == row.id()) {
                    rows.insert(index.min(rows.len()), row);
                }
            }
        }
    }

    /// Replace the optimistic row with what the store returned.
    pub fn confirm(self, rows: &mut Vec<LocalRow<R>>, stored: Option<R>) {
        match (self, stored) {
            (Self::Inserted(id), Some(row)) => match rows.iter_mut().find(|l| l.id() == id) {
                Some(local) => settle(local, row),
                None => rows.push(LocalRow::new(row)),
            },
            (Self::Updated { previous, .. }, Some(row)) => {
                if let Some(local) = rows.iter_mut().find(|l| l.id() == previous.id()) {
                    settle(local, row);
                }
            }
            (Self::Deleted { row, .. }, _) => rows.retain(|l| l.id() != row.id()),
            (_, None) => {}
        }
    }
}

fn settle<R>(local: &mut LocalRow<R>, row: R) {
    local.row = row;
    local.flags.pending = false;
}
