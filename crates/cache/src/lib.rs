pub mod store;

pub use store::LocalCache;
