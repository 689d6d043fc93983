//! Cache module - process-local lookup cache

mod lookup_cache;

pub use lookup_cache::MokaTokenCache;
