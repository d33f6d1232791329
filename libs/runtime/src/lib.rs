//! Process-level plumbing shared by the userdb binaries: descriptor-driven
//! configuration resolution and logging bootstrap.

pub mod args;
pub mod config;
pub mod logging;
pub mod properties;

pub use args::parse_args;
pub use config::{
    AppConfig, ArgSeparator, ConfigError, ConfigResolver, ConfigSources, Parameter, ParserConfig,
    ResolvedParam, ValueSource, CONFIG_FILE_ID, DEFAULT_PARSER_CONFIG, UNSET,
};
pub use logging::{init_logging, LoggingSettings};
