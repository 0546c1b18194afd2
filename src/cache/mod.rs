//! Memo tables for graph traversals.
//!
//! Both traversal contexts key their memo tables by node handle ([`Ref`][crate::reference::Ref]):
//!
//! | Context | Key | Value |
//! |---------|-----|-------|
//! | [`DiffContext`][crate::diff::DiffContext] | node | derivative node |
//! | [`EvalContext`][crate::eval::EvalContext] | node | numeric value |
//!
//! A memo table must never evict: the "each node at most once per context" guarantee
//! depends on it. [`HashMapCache`] is collision-free and grows dynamically.
//!
//! # Example
//!
//! ```
//! use symdiff_rs::cache::Cache;
//! use symdiff_rs::reference::Ref;
//!
//! let mut cache = Cache::<Ref, f64>::new(4);
//! cache.insert(Ref::new(1), 42.0);
//! assert_eq!(cache.get(&Ref::new(1)), Some(42.0));
//! assert_eq!(cache.hits(), 1);
//! ```

mod hashmap;

pub use hashmap::HashMapCache;

/// Default cache implementation.
pub type Cache<K, V> = HashMapCache<K, V>;
