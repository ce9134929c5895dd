pub mod app_config;
pub mod config;
pub mod geo;
pub mod job_location;

pub use app_config::{AppConfig, Environment};
pub use config::{
    build_app_config, load_app_config, load_app_config_from_env, DEFAULT_GEO_BASE_URL,
    DEFAULT_GEO_USER_AGENT,
};
pub use geo::{AdminCode, GeoLookup, GeographicUnit, LookupTable};
pub use job_location::{
    compose_label, resolve_job_location, Axis, CodePath, JobLocation, JobLocationResolver,
    JobLocationSource, NamePath,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
