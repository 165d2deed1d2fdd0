pub mod postgres;

pub use postgres::create_pool;
