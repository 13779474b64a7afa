pub mod kv;
pub mod library;
pub mod routes;
pub mod sync;
