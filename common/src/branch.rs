//! Transactional branches over the ledger facade
//! A branch is a copy-on-write view of the ledger. Writes made on a branch reach the base
//! ledger only through an explicit commit; a dropped branch leaves no trace.
//! Implementations should use persistent (imbl) collections so that opening a branch is cheap.

use crate::ledger::LedgerFacade;
use tracing::trace;

/// A ledger that can be branched and have branches committed back
pub trait Branchable: LedgerFacade + Sized {
    /// Open an independent copy-on-write branch of the current state
    fn branch(&self) -> Self;

    /// Replace the current state with a branch previously opened from it
    fn commit(&mut self, branch: Self);
}

/// A branch that is always discarded
/// Runs real mutating ledger logic so that queries can read its results
pub struct SimulationBranch<L: Branchable> {
    ledger: L,
}

impl<L: Branchable> SimulationBranch<L> {
    /// Open over a base ledger - the base is only ever borrowed immutably
    pub fn open(base: &L) -> Self {
        trace!("Opening simulation branch");
        Self {
            ledger: base.branch(),
        }
    }

    /// Mutable access to the branch state
    pub fn ledger(&mut self) -> &mut L {
        &mut self.ledger
    }
}

impl<L: Branchable> Drop for SimulationBranch<L> {
    fn drop(&mut self) {
        trace!("Discarding simulation branch");
    }
}

/// Run `f` against a throwaway branch of `base` and return what it computed.
/// Nothing `f` writes is observable afterwards, whether it succeeds or fails.
pub fn simulate<L, T, E, F>(base: &L, f: F) -> Result<T, E>
where
    L: Branchable,
    F: FnOnce(&mut L) -> Result<T, E>,
{
    let mut branch = SimulationBranch::open(base);
    f(branch.ledger())
}

/// Run `f` against a branch of `base`, committing its writes only if it succeeds
pub fn transact<L, T, E, F>(base: &mut L, f: F) -> Result<T, E>
where
    L: Branchable,
    F: FnOnce(&mut L) -> Result<T, E>,
{
    let mut branch = base.branch();
    match f(&mut branch) {
        Ok(value) => {
            base.commit(branch);
            Ok(value)
        }
        Err(e) => {
            trace!("Rolling back failed transaction");
            Err(e)
        }
    }
}
