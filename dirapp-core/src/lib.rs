//! dirapp core library: IIS configuration model, stores, profiles, errors.
//!
//! - [`document`]: XML ⇄ keyed tree, single-vs-list normalization
//! - [`store`]: the [`ConfigStore`] contract, [`Snapshot`], [`store::open`]
//! - [`appcmd`] / [`direct`]: the two mutation backends
//! - [`backup`]: numbered `.bak` copies of the configuration file
//! - [`profile`]: YAML watch profiles under `~/.dirapp/profiles/`
//! - [`paths`]: marker-file → application path translation
//! - [`log`]: the injected [`EventLog`] capability

pub mod appcmd;
pub mod backup;
pub mod direct;
pub mod document;
pub mod error;
pub mod log;
pub mod paths;
pub mod profile;
pub mod store;
pub mod types;

pub use error::{ConfigError, ProfileError};
pub use log::{EventLog, MemoryLog, TracingLog};
pub use store::{ConfigStore, Snapshot, StoreOptions};
pub use types::{
    Application, Backend, Outcome, Site, SiteApplication, SiteName, VirtualDirectory,
    WritePolicy,
};
