//! Employee directory client: session handling, the HTTP transport pipeline,
//! and the schema store and record list controller built on top of it.

pub mod api;
pub mod config;
pub mod controller;
pub mod gate;
pub mod observability;
pub mod schema_store;
pub mod session;
pub mod transport;

pub use api::{ApiClient, EmployeeBackend};
pub use config::{ClientConfig, LogConfig};
pub use controller::{FormTarget, ListSnapshot, ListStatus, ListView, Notice, NoticeLevel, RecordListController};
pub use gate::{GateDecision, SessionGate};
pub use schema_store::{SchemaStatus, SchemaStore, SchemaView};
pub use session::{CredentialSource, IdentityProvider, Session, SessionService, SessionState};
pub use transport::TransportError;
