//! Providers: declared objects reconciled against the CIB.
//!
//! Each provider implements [`declarative::Resource`] over a [`CibStore`],
//! so a plan of declared constraints and properties can be driven by the
//! generic executor. The hooks are also available as inherent methods
//! returning [`crate::Error`] for callers that want the typed error.

mod constraint;
mod property;

pub use constraint::{ConstraintProvider, DeclaredConstraint, PatchIntent, PatchOperation};
pub use property::{DeclaredProperty, PropertyProvider};

use crate::cib::CibStore;
use crate::error::Result;

/// Run `f` with debug mode forced on when `debug` is set.
///
/// The previous mode is restored whatever `f` returns.
fn with_debug<T>(
    store: &mut CibStore,
    debug: bool,
    f: impl FnOnce(&mut CibStore) -> Result<T>,
) -> Result<T> {
    if !debug {
        return f(store);
    }
    let previous = store.set_debug(true);
    let result = f(store);
    store.set_debug(previous);
    result
}
