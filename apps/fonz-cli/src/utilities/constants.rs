pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "fonz";
pub const USER_DIRECTORY: &str = ".fonz";
pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "FONZ";
pub const LOG_FILE_PREFIX: &str = "cli.log";

/// Separates model and explore in explore selectors, e.g. `ecommerce/orders`
pub const SELECTOR_SEPARATOR: char = '/';
pub const SELECTOR_WILDCARD: &str = "*";
