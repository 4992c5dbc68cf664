//! Configuration management for relate
//!
//! Named environments live in `<config>/config.toml`. Every write goes
//! through [`io::update_config`] so the file on disk is always valid.
//!
//! ```toml
//! default_environment = "work"
//!
//! [environments.work]
//! type = "local"
//!
//! [environments.cloud]
//! type = "remote"
//! remote_url = "https://relate.example.com"
//! ```

pub mod io;
pub mod schema;

pub use io::{add_environment, get_config_path, load_config, set_default_environment, update_config};
pub use schema::{EnvironmentEntry, RelateConfig};
