//! Lazarus Reconciler - Cluster Self-Healing
//!
//! Detects persistent quorum loss in a Galera-style replication cluster
//! and drives the elected bootstrap leader through an escalating recovery:
//! soft provider-level bootstrap first, forced restart with the on-disk
//! safety flag overridden as the last resort.
//!
//! # Architecture
//!
//! - **Machine**: the linear state machine (evaluate → confirm →
//!   leadership → soft attempts → hard bootstrap) behind collaborator
//!   seams so decision logic is testable without a cluster
//! - **Mysql / Service**: the live collaborators (control connection,
//!   service manager, process signals)
//! - **Grastate**: atomic rewrite of the `safe_to_bootstrap` marker
//! - **Credentials / Config**: startup-time immutable inputs
//!
//! # Example
//!
//! ```no_run
//! use lazarus_reconciler::{
//!     Credentials, MysqlAdmin, Reconciler, ReconcilerConfig, SysvService,
//! };
//! use lazarus_registry::RegistryClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReconcilerConfig::from_env();
//!     let credentials = Credentials::load(&config.credentials_path)?;
//!     let source = RegistryClient::new(config.registry.clone())?;
//!     let db = MysqlAdmin::new(&config.mysql_host, &credentials);
//!     let control = SysvService::new(&config);
//!
//!     let outcome = Reconciler::new(config, source, db, control).run().await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod grastate;
pub mod machine;
pub mod mysql;
pub mod service;

pub use config::ReconcilerConfig;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use machine::{DatabaseAdmin, Outcome, Reconciler, ServiceControl};
pub use mysql::MysqlAdmin;
pub use service::SysvService;
