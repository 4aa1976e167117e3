pub mod schema;

pub use schema::{
    Config, GatewayConfig, GenerationDefaults, PromptConfig, ProviderConfig, SessionConfig,
};
