use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::ops::RangeInclusive;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl_hours: i64,
    pub mail: MailConfig,
    pub admin: Option<AdminAccount>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub gateway_url: Option<String>,
    pub token: Option<String>,
    pub from: String,
    pub timeout_secs: u64,
}

/// Admin login ensured at startup from `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
#[derive(Clone)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injectable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Config {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            session_ttl_hours: parse_in_range(&lookup, "SESSION_TTL_HOURS", 24 * 7, 1..=24 * 365)?,
            mail: MailConfig {
                gateway_url: lookup("MAIL_GATEWAY_URL").filter(|v| !v.is_empty()),
                token: lookup("MAIL_GATEWAY_TOKEN").filter(|v| !v.is_empty()),
                from: lookup("MAIL_FROM").unwrap_or_else(|| "no-reply@clinic.local".to_string()),
                timeout_secs: parse_in_range(&lookup, "MAIL_TIMEOUT_SECS", 10, 1..=300)?,
            },
            admin: admin_account(&lookup)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid { name: "HOST", value: raw })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Like `parse_or`, but the value must also fall inside `range`.
fn parse_in_range<F, T>(lookup: &F, name: &'static str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + fmt::Display,
{
    let value = parse_or(lookup, name, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid { name, value: value.to_string() });
    }
    Ok(value)
}

fn admin_account<F>(lookup: &F) -> Result<Option<AdminAccount>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    match (present("ADMIN_EMAIL"), present("ADMIN_PASSWORD")) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing("ADMIN_PASSWORD")),
        (None, Some(_)) => Err(ConfigError::Missing("ADMIN_EMAIL")),
        (Some(email), Some(password)) => Ok(Some(AdminAccount {
            name: present("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            email,
            password,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/clinic")])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.session_ttl_hours, 168);
        assert!(cfg.mail.gateway_url.is_none());
        assert_eq!(cfg.mail.timeout_secs, 10);
        assert!(cfg.admin.is_none());
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value 'eighty'");
    }

    #[test]
    fn session_ttl_must_be_between_an_hour_and_a_year() {
        for bad in ["0", "-5", "8761", "9223372036854775807"] {
            let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("SESSION_TTL_HOURS", bad)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "SESSION_TTL_HOURS", .. }),
                "{bad}: {err}"
            );
        }
        let cfg = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("SESSION_TTL_HOURS", "8760")]))
            .unwrap();
        assert_eq!(cfg.session_ttl_hours, 8760);
    }

    #[test]
    fn mail_timeout_is_bounded() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("MAIL_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "MAIL_TIMEOUT_SECS has an invalid value '0'");
    }

    #[test]
    fn admin_account_needs_email_and_password() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("ADMIN_EMAIL", "admin@clinic.local"),
            ("ADMIN_PASSWORD", "s3cret!"),
        ]))
        .unwrap();
        let admin = cfg.admin.unwrap();
        assert_eq!(admin.email, "admin@clinic.local");
        assert_eq!(admin.name, "Administrator");
        assert!(!format!("{admin:?}").contains("s3cret!"));

        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("ADMIN_EMAIL", "a@b.com")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ADMIN_PASSWORD")));
    }
}
