use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use platform_authn::{AuthConfig, MAX_ACCESS_TTL_MINUTES, MAX_REFRESH_TTL_DAYS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET_BASE64").context("JWT_SECRET_BASE64 missing")?;
        let jwt_secret = STANDARD
            .decode(secret.trim())
            .context("invalid JWT_SECRET_BASE64")?;
        if jwt_secret.len() < 32 {
            return Err(anyhow!(
                "JWT_SECRET_BASE64 must decode to at least 32 bytes"
            ));
        }

        let defaults = AuthConfig::default();
        let access_ttl_minutes = lifetime(
            "ACCESS_TOKEN_TTL_MINUTES",
            env_number("ACCESS_TOKEN_TTL_MINUTES")?,
            defaults.access_ttl_minutes,
            MAX_ACCESS_TTL_MINUTES,
        )?;
        let refresh_ttl_days = lifetime(
            "REFRESH_TOKEN_TTL_DAYS",
            env_number("REFRESH_TOKEN_TTL_DAYS")?,
            defaults.refresh_ttl_days,
            MAX_REFRESH_TTL_DAYS,
        )?;

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        Ok(Self {
            auth: AuthConfig {
                jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            cors_allowed_origins,
        })
    }
}

fn env_number(key: &str) -> Result<Option<i64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be an integer")),
        Err(_) => Ok(None),
    }
}

fn lifetime(key: &str, value: Option<i64>, default: i64, max: i64) -> Result<i64> {
    let value = value.unwrap_or(default);
    if !(1..=max).contains(&value) {
        return Err(anyhow!("{key} must be between 1 and {max}, got {value}"));
    }
    Ok(value)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_are_bounded() {
        assert_eq!(lifetime("TTL", None, 15, MAX_ACCESS_TTL_MINUTES).unwrap(), 15);
        assert_eq!(lifetime("TTL", Some(60), 15, MAX_ACCESS_TTL_MINUTES).unwrap(), 60);
        assert!(lifetime("TTL", Some(0), 15, MAX_ACCESS_TTL_MINUTES).is_err());
        assert!(lifetime("TTL", Some(-5), 15, MAX_ACCESS_TTL_MINUTES).is_err());
        let err = lifetime(
            "ACCESS_TOKEN_TTL_MINUTES",
            Some(4_611_686_018_427_387_903),
            15,
            MAX_ACCESS_TTL_MINUTES,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_TTL_MINUTES"));
        let too_long = Some(MAX_REFRESH_TTL_DAYS + 1);
        assert!(lifetime("TTL", too_long, 30, MAX_REFRESH_TTL_DAYS).is_err());
    }

    #[test]
    fn origins_skip_blanks() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
