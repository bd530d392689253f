//! Rename correlation.
//!
//! Both platforms report a rename as two records. Windows emits
//! `RENAMED_OLD_NAME` immediately followed by `RENAMED_NEW_NAME`; inotify emits
//! `IN_MOVED_FROM` and `IN_MOVED_TO` sharing a cookie. [`RenamePairer`] joins
//! the halves according to the configured [`RenamePolicy`].
//!
//! An old-name half with no partner yet is held for one more read cycle. If
//! the next cycle does not carry the partner, or the watcher finds nothing new
//! to read, the half is released as [`ChangeKind::Removed`] ahead of that
//! cycle's own events, so removals keep their order relative to later changes.
//! A new-name half with no partner is reported as [`ChangeKind::Added`].

use std::collections::VecDeque;

use smallvec::SmallVec;
use sw_core::{ChangeEvent, ChangeKind, RenamePolicy};

use crate::decode::{RawAction, RawChange};

#[derive(Debug)]
struct PendingFrom {
    name: String,
    cookie: Option<u32>,
    cycle: u64,
}

/// Joins rename halves and converts [`RawChange`]s into [`ChangeEvent`]s.
#[derive(Debug)]
pub struct RenamePairer {
    policy: RenamePolicy,
    pending: SmallVec<[PendingFrom; 4]>,
    cycle: u64,
}

impl RenamePairer {
    /// Creates a pairer using `policy`.
    #[must_use]
    pub fn new(policy: RenamePolicy) -> Self {
        Self {
            policy,
            pending: SmallVec::new(),
            cycle: 0,
        }
    }

    /// Returns `true` if an old-name half is waiting for its partner.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Converts the changes from one read cycle, appending events to `out`.
    ///
    /// Overflow markers must be removed by the caller.
    pub fn process<I>(&mut self, changes: I, out: &mut VecDeque<ChangeEvent>)
    where
        I: IntoIterator<Item = RawChange>,
    {
        self.cycle += 1;
        let changes: Vec<RawChange> = changes.into_iter().collect();
        self.release_unmatched(&changes, out);

        for change in changes {
            match change.action {
                RawAction::Created => out.push_back(ChangeEvent::added(change.name)),
                RawAction::Deleted => out.push_back(ChangeEvent::removed(change.name)),
                RawAction::Modified | RawAction::Overflow => {
                    out.push_back(ChangeEvent::modified(change.name));
                }
                RawAction::RenamedOld => self.pending.push(PendingFrom {
                    name: change.name,
                    cookie: change.cookie,
                    cycle: self.cycle,
                }),
                RawAction::RenamedNew => match self.take_partner(change.cookie) {
                    Some(from) => self.emit_rename(from, change.name, out),
                    None => {
                        tracing::trace!(name = %change.name, "Rename target without source");
                        out.push_back(ChangeEvent::added(change.name));
                    }
                },
            }
        }

        // Anything still held from an earlier cycle has had its chance.
        let current = self.cycle;
        self.release_where(|pending| pending.cycle < current, out);
    }

    /// Releases halves carried from an earlier cycle whose partner is not in
    /// `changes`, ahead of the batch's own events.
    fn release_unmatched(&mut self, changes: &[RawChange], out: &mut VecDeque<ChangeEvent>) {
        let current = self.cycle;
        let leads_with_new = changes.first().is_some_and(|change| {
            change.action == RawAction::RenamedNew && change.cookie.is_none()
        });
        let latest_uncorrelated = self
            .pending
            .iter()
            .rposition(|pending| pending.cookie.is_none());

        let mut index = 0;
        self.pending.retain(|pending| {
            let position = index;
            index += 1;
            if pending.cycle >= current {
                return true;
            }
            let matched = match pending.cookie {
                Some(cookie) => changes.iter().any(|change| {
                    change.action == RawAction::RenamedNew && change.cookie == Some(cookie)
                }),
                None => leads_with_new && latest_uncorrelated == Some(position),
            };
            if !matched {
                tracing::trace!(name = %pending.name, "Rename source without target");
                out.push_back(ChangeEvent::removed(std::mem::take(&mut pending.name)));
            }
            matched
        });
    }

    /// Releases every held old-name half as a removal.
    pub fn flush(&mut self, out: &mut VecDeque<ChangeEvent>) {
        self.release_where(|_| true, out);
    }

    /// Drops held halves without reporting them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn take_partner(&mut self, cookie: Option<u32>) -> Option<PendingFrom> {
        let index = match cookie {
            Some(cookie) => self
                .pending
                .iter()
                .position(|pending| pending.cookie == Some(cookie)),
            // Uncorrelated halves pair with the most recent old name.
            None => self
                .pending
                .iter()
                .rposition(|pending| pending.cookie.is_none()),
        }?;
        Some(self.pending.remove(index))
    }

    fn emit_rename(&self, from: PendingFrom, to: String, out: &mut VecDeque<ChangeEvent>) {
        match self.policy {
            RenamePolicy::Split => {
                out.push_back(ChangeEvent::renamed_from(from.name.clone()));
                out.push_back(ChangeEvent::renamed_to(to, Some(from.name)));
            }
            _ => out.push_back(ChangeEvent::renamed(from.name, to)),
        }
    }

    fn release_where<F>(&mut self, mut expired: F, out: &mut VecDeque<ChangeEvent>)
    where
        F: FnMut(&PendingFrom) -> bool,
    {
        let mut index = 0;
        while index < self.pending.len() {
            if expired(&self.pending[index]) {
                let from = self.pending.remove(index);
                tracing::trace!(name = %from.name, "Rename source without target");
                out.push_back(ChangeEvent::new(ChangeKind::Removed, from.name));
            } else {
                index += 1;
            }
        }
    }
}
