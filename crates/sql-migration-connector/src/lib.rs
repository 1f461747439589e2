//! `sqlx`-backed implementation of the connector components: C1
//! introspection, C2 FK inference, C3 relationship resolution, C4
//! classification, C5 row streaming, C6 routine migration, C7 schema
//! migration, and C10 destructive operations. All network I/O for the
//! toolkit lives in this crate; `migration-connector` stays transport-free.

pub mod classifier;
pub mod destructive;
pub mod fk_inference;
pub mod introspection;
pub mod resolver;
pub mod routines;
pub mod row_streamer;
pub mod schema;
pub mod value;

use migration_connector::model::ServerEndpoint;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

/// Open a connection pool against `endpoint`, optionally scoped to one
/// database. `role` is `"source"` or `"destination"`, used only to
/// label the resulting [`migration_connector::error::ConnectionError`].
pub async fn connect(
    endpoint: &ServerEndpoint,
    database: Option<&str>,
    role: &'static str,
) -> Result<MySqlPool, migration_connector::error::ConnectionError> {
    let url = endpoint.connection_url(database);

    MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .map_err(|e| migration_connector::error::ConnectionError::ConnectFailed {
            role,
            endpoint: format!("{}:{}", endpoint.host, endpoint.port),
            reason: e.to_string(),
        })
}
