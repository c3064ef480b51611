//! External source connectors
//!
//! One [`SourceConnector`](dashsync_core::SourceConnector) per source family,
//! opened through [`SourceConnectorFactory`].

pub mod factory;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod rest;

pub use factory::SourceConnectorFactory;
pub use mongo::MongoConnector;
pub use mysql::MySqlConnector;
pub use postgres::PostgresConnector;
pub use rest::RestConnector;
