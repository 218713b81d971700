//! Merging a freshly fetched collection into the local one.
//!
//! The fetched rows are authoritative for content and order. Client-only
//! flags survive when a row with the same id is still present.

use std::collections::HashMap;

use touchline_core::feed::SyncRow;
use touchline_core::types::RowId;

/// Client-only state attached to a row. Never sent to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFlags {
    /// The row is open in an inline editor.
    pub editing: bool,
    /// An optimistic write for this row has not been confirmed yet.
    pub pending: bool,
}

/// A row as held by a feed cache.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRow<R> {
    pub row: R,
    pub flags: RowFlags,
}

impl<R: SyncRow> LocalRow<R> {
    pub fn new(row: R) -> Self {
        Self {
            row,
            flags: RowFlags::default(),
        }
    }

    pub fn id(&self) -> RowId {
        self.row.row_id()
    }
}

/// Replace `local` with `fresh`, carrying flags over by row id.
///
/// Rows only present locally are dropped; rows only present in `fresh` get
/// default flags.
pub fn reconcile<R: SyncRow>(local: &[LocalRow<R>], fresh: Vec<R>) -> Vec<LocalRow<R>> {
    let flags: HashMap<RowId, RowFlags> = local.iter().map(|l| (l.id(), l.flags)).collect();
    fresh
        .into_iter()
        .map(|row| {
            let flags = flags.get(&row.row_id()).copied().unwrap_or_default();
            LocalRow { row, flags }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use touchline_core::models::{Rule, RuleCategory};
    use uuid::Uuid;

    use super::*;

    fn rule(club: Uuid, content: &str) -> Rule {
        Rule::new(club, None, RuleCategory::General, content)
    }

    #[test]
    fn editing_flag_survives_and_new_rows_are_added() {
        let club = Uuid::new_v4();
        let r1 = rule(club, "Arrive 15 minutes early");
        let r2 = rule(club, "Shin pads at every session");

        let mut local = vec![LocalRow::new(r1.clone())];
        local[0].flags.editing = true;

        let mut r1_fresh = r1.clone();
        r1_fresh.content = "Arrive 20 minutes early".into();
        let merged = reconcile(&local, vec![r1_fresh, r2.clone()]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].row.content, "Arrive 20 minutes early");
        assert!(merged[0].flags.editing);
        assert_eq!(merged[1].id(), r2.id);
        assert!(!merged[1].flags.editing);
    }

    #[test]
    fn rows_missing_from_fetch_are_dropped() {
        let club = Uuid::new_v4();
        let local = vec![LocalRow::new(rule(club, "a")), LocalRow::new(rule(club, "b"))];
        let keep = local[1].row.clone();

        let merged = reconcile(&local, vec![keep.clone()]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id(), keep.id);
    }

    #[test]
    fn fetched_order_wins() {
        let club = Uuid::new_v4();
        let a = rule(club, "a");
        let b = rule(club, "b");
        let local = vec![LocalRow::new(a.clone()), LocalRow::new(b.clone())];

        let merged = reconcile(&local, vec![b.clone(), a.clone()]);
        let ids: Vec<_> = merged.iter().map(LocalRow::id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
