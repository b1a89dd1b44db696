//! Schema reconciliation between instances and their shape-library masters.
//!
//! Link and spotter instances copy their positional data fields (`c00.Gain`,
//! `i01.Flow`) from the master when drawn. Masters evolve afterwards: fields
//! get renumbered, added or dropped. Reconciliation brings each instance back
//! in line while keeping the values the user typed.
//!
//! Fields are matched by their tail, the name after the positional prefix.
//! Non-positional fields (`Key`, `drawing`, ...) are never touched.

use std::fmt;

use log::{debug, warn};

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::{Element, ElementRef},
    library::{MasterRecord, ShapeLibrary},
};
use netweave_parser::field_key::{field_tail, is_positional};

/// One edit applied to an instance's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// A field moved to the master's key, value kept.
    Renamed { from: String, to: String },
    /// A master field was missing and got its default.
    Added { key: String, value: String },
    /// A positional field unknown to the master, or a stale duplicate.
    Removed { key: String, value: String },
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Renamed { from, to } => write!(f, "renamed `{from}` to `{to}`"),
            FieldChange::Added { key, value } => write!(f, "added `{key}` = `{value}`"),
            FieldChange::Removed { key, value } => write!(f, "removed `{key}` (was `{value}`)"),
        }
    }
}

/// Changes applied to one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub element: ElementRef,
    pub changes: Vec<FieldChange>,
}

/// Outcome of reconciling a set of elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// One report per element that changed.
    pub reports: Vec<ReconcileReport>,
    /// Elements skipped because the library has no master for them.
    pub missing_masters: Vec<ElementRef>,
}

impl Reconciliation {
    /// Total number of field changes.
    pub fn change_count(&self) -> usize {
        self.reports.iter().map(|report| report.changes.len()).sum()
    }
}

/// Reconcile one element's fields against `master`.
///
/// Returns the changes made; an empty list means the element already matched.
pub fn reconcile_element(element: &mut Element, master: &MasterRecord) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let fields = element.fields_mut();

    for (master_key, default) in master.fields() {
        if fields.contains_key(master_key) {
            continue;
        }

        let tail = field_tail(master_key);
        let candidate = fields
            .keys()
            .find(|key| {
                is_positional(key)
                    && !master.fields().contains_key(*key)
                    && tail.is_some()
                    && field_tail(key) == tail
            })
            .cloned();

        match candidate.and_then(|key| fields.shift_remove_full(&key)) {
            Some((index, from, value)) => {
                fields.shift_insert(index, master_key.clone(), value);
                changes.push(FieldChange::Renamed {
                    from,
                    to: master_key.clone(),
                });
            }
            None => {
                fields.insert(master_key.clone(), default.clone());
                changes.push(FieldChange::Added {
                    key: master_key.clone(),
                    value: default.clone(),
                });
            }
        }
    }

    let unknown: Vec<String> = fields
        .keys()
        .filter(|key| is_positional(key) && !master.fields().contains_key(*key))
        .cloned()
        .collect();
    for key in unknown {
        if let Some(value) = fields.shift_remove(&key) {
            changes.push(FieldChange::Removed { key, value });
        }
    }

    changes
}

/// Reconcile every element in `elements` against its master in `library`.
///
/// Never fails: elements without a master are reported and left untouched.
pub fn reconcile(
    diagram: &mut Diagram,
    elements: &[ElementIndex],
    library: &dyn ShapeLibrary,
) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    for &idx in elements {
        let Some(element) = diagram.get_mut(idx) else {
            continue;
        };
        let Some(master) = library.master_for_element(element) else {
            warn!(element:% = element.element_ref(); "No master record, skipping reconciliation");
            outcome.missing_masters.push(element.element_ref());
            continue;
        };

        let changes = reconcile_element(element, master);
        if changes.is_empty() {
            continue;
        }
        for change in &changes {
            debug!(element:% = element.element_ref(), change:% = change; "Field reconciled");
        }
        outcome.reports.push(ReconcileReport {
            element: element.element_ref(),
            changes,
        });
    }

    outcome
}
