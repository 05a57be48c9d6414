use client::client::ClientConfig;
use types::error::Error;

pub const DEFAULT_LANGUAGE: &str = "fr";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub language: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(Error::MissingConfig(key))
        };
        Ok(Self {
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            language: lookup("CANSTORY_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.supabase_url.clone(),
            anon_key: self.supabase_anon_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://canstory.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("CANSTORY_LANGUAGE", "ar"),
        ]))
        .unwrap();

        assert_eq!(config.language, "ar");
        assert_eq!(
            config.client_config(),
            ClientConfig {
                url: "https://canstory.supabase.co".to_string(),
                anon_key: "anon".to_string(),
            }
        );
    }

    #[test]
    fn language_defaults_to_french() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://canstory.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();
        assert_eq!(config.language, DEFAULT_LANGUAGE);
    }

    #[rstest]
    #[case(&[("SUPABASE_ANON_KEY", "anon")], "SUPABASE_URL")]
    #[case(&[("SUPABASE_URL", "https://x.supabase.co")], "SUPABASE_ANON_KEY")]
    #[case(&[("SUPABASE_URL", " "), ("SUPABASE_ANON_KEY", "anon")], "SUPABASE_URL")]
    fn missing_variable_is_reported(#[case] vars: &[(&str, &str)], #[case] missing: &'static str) {
        let error = Config::from_lookup(lookup(vars)).unwrap_err();
        assert_eq!(error, Error::MissingConfig(missing));
    }
}
