pub mod gemini;
pub mod traits;

pub use traits::{GenerateRequest, GenerationConfig, Provider};

use std::time::Duration;

/// Factory: create the right provider from config
pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    base_url: Option<&str>,
    timeout: Option<Duration>,
) -> anyhow::Result<Box<dyn Provider>> {
    match name {
        "gemini" | "google" | "google-gemini" => Ok(Box::new(gemini::GeminiProvider::new(
            api_key, base_url, timeout,
        ))),

        _ => anyhow::bail!(
            "Unknown provider: {name}. Only \"gemini\" is currently supported."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_gemini() {
        assert!(create_provider("gemini", Some("key"), None, None).is_ok());
        assert!(create_provider("google", Some("key"), None, None).is_ok());
        assert!(create_provider("google-gemini", None, None, None).is_ok());
    }

    #[test]
    fn factory_passes_through_timeout_and_url() {
        let provider = create_provider(
            "gemini",
            Some("key"),
            Some("http://127.0.0.1:1"),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn factory_unknown_provider_errors() {
        let p = create_provider("nonexistent", None, None, None);
        assert!(p.is_err());
        let msg = p.err().unwrap().to_string();
        assert!(msg.contains("Unknown provider"));
    }

    #[test]
    fn factory_empty_name_errors() {
        assert!(create_provider("", None, None, None).is_err());
    }
}
