use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct GrozenConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub models: ModelConfig,
    pub google: GoogleConfig,
    pub auth: AuthConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Which backend serves the flows.
    pub provider: ProviderKind,
    /// Model for JSON flows and face validation (e.g., gemini-2.0-flash)
    pub text_model: String,
    /// Model for share image generation
    pub image_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Mock,
}

impl std::str::FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "GENAI_PROVIDER must be 'gemini' or 'mock', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the identity provider signs ID tokens with (HS256).
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    /// Emails granted the admin views in addition to the `admin` claim.
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

impl GrozenConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let provider: ProviderKind = get_env("GENAI_PROVIDER", Some("gemini"), is_prod)?.parse()?;

        // The mock provider never calls out, so the key is only required for Gemini.
        let api_key_default = match provider {
            ProviderKind::Mock => Some(""),
            ProviderKind::Gemini => None,
        };

        Ok(GrozenConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("grozen_db"), is_prod)?,
            },
            models: ModelConfig {
                provider,
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-2.0-flash"), is_prod)?,
                image_model: get_env(
                    "GENAI_IMAGE_MODEL",
                    Some("gemini-2.0-flash-preview-image-generation"),
                    is_prod,
                )?,
            },
            google: GoogleConfig {
                api_key: get_env("GOOGLE_API_KEY", api_key_default, is_prod)?,
            },
            auth: AuthConfig {
                jwt_secret: get_env("AUTH_JWT_SECRET", None, is_prod)?,
                issuer: get_env("AUTH_ISSUER", Some("grozen-auth"), is_prod)?,
                audience: get_env("AUTH_AUDIENCE", Some("grozen"), is_prod)?,
                admin_emails: parse_list(&get_env("ADMIN_EMAILS", Some(""), is_prod)?),
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_admin_email_list() {
        let list = parse_list(" coach@grozen.app, ,ops@grozen.app ");
        assert_eq!(list, vec!["coach@grozen.app", "ops@grozen.app"]);
    }

    #[test]
    fn admin_email_match_ignores_case() {
        let auth = AuthConfig {
            jwt_secret: "s".to_string(),
            issuer: "i".to_string(),
            audience: "a".to_string(),
            admin_emails: vec!["Coach@GroZen.app".to_string()],
        };
        assert!(auth.is_admin_email("coach@grozen.app"));
        assert!(!auth.is_admin_email("teen@grozen.app"));
    }

    #[test]
    fn provider_kind_parses_known_values() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::Mock);
        assert!("openai".parse::<ProviderKind>().is_err());
    }
}
