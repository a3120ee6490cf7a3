//! Live database control surface backed by mysql_async.

use async_trait::async_trait;
use mysql_async::prelude::*;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::machine::DatabaseAdmin;

/// Administrative client for the local database instance.
///
/// Connections are opened per call and dropped immediately after: the
/// whole point of the readiness probe is a fresh observation, and during
/// recovery the server may be restarted under us at any time.
pub struct MysqlAdmin {
    opts: mysql_async::Opts,
}

impl MysqlAdmin {
    /// Build an admin client for the given host with stored credentials.
    pub fn new(host: &str, credentials: &Credentials) -> Self {
        let opts = mysql_async::OptsBuilder::default()
            .ip_or_hostname(host)
            .user(Some(credentials.user.clone()))
            .pass(Some(credentials.password.clone()))
            .into();
        Self { opts }
    }
}

#[async_trait]
impl DatabaseAdmin for MysqlAdmin {
    async fn cluster_ready(&self) -> Result<bool> {
        let mut conn = mysql_async::Conn::new(self.opts.clone()).await?;
        let row: Option<(String, String)> = conn
            .query_first("SHOW GLOBAL STATUS LIKE 'wsrep_ready'")
            .await?;
        conn.disconnect().await?;

        debug!(?row, "wsrep_ready probe");
        Ok(matches!(row, Some((_, value)) if value == "ON"))
    }

    async fn request_primary_component(&self) -> Result<()> {
        let mut conn = mysql_async::Conn::new(self.opts.clone()).await?;
        conn.query_drop("SET GLOBAL wsrep_provider_options='pc.bootstrap=YES'")
            .await?;
        conn.disconnect().await?;
        Ok(())
    }
}
