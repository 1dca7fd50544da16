//! Run configuration: the YAML file named on the command line (`config.yml`
//! by default) deserialized into [`RunConfig`]. Modeled after
//! `mantis::config::settings::Settings`'s search-and-load pattern, adapted
//! from TOML to YAML since `SPEC_FULL.md` names `config.yml` explicitly.

mod settings;

pub use settings::{
    CheckScopeConfig, ConfigError, ConnectionConfig, CustomSql, DatabasesConfig,
    LoggingConfig, PerformanceConfig, RunConfig,
};
