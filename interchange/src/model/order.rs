//! Process-wide field ordering counter.
//!
//! Every [`Field`](crate::Field) receives the next value of this counter when
//! it is constructed. Listing a schema's fields sorts by it, so declaration
//! order survives maps, merges and round trips through a document.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ORDER: AtomicU64 = AtomicU64::new(0);

/// Returns a fresh ordering integer, strictly greater than every integer
/// handed out before it in this process.
pub fn next() -> u64 {
    NEXT_ORDER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing() {
        let a = next();
        let b = next();
        let c = next();
        assert!(a < b && b < c);
    }
}
