// Version metadata subsystem: fetching the per-source feeds, typed access
// to their records, and the per-run aggregate store.

pub mod fetcher;
pub mod provider;
pub mod store;
