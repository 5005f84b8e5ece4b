//! Layered Config Library
//!
//! Resolves a versioned configuration tree from a root YAML file, included
//! files, environment variables, a `.env` file and `key=value` overrides.
//!
//! ```no_run
//! use layered_config::config::{Configurer, Resolver};
//!
//! let resolver = Resolver::builder()
//!     .path("configs/.rr.yaml")
//!     .prefix("rr")
//!     .flag("http.address=127.0.0.1:8080")
//!     .host_version("2.8.1")
//!     .resolve()?;
//!
//! let address = resolver.get("http.address");
//! # Ok::<(), layered_config::error::ConfigError>(())
//! ```

pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod logging;
pub mod paths;
pub mod store;
