pub mod dashboard_config;
pub mod rules_config;

pub use dashboard_config::*;
pub use rules_config::RulesConfig;
