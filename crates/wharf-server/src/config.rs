//! Server configuration.
//!
//! Built once at startup from environment variables and turned into a
//! [`TokenPipeline`](wharf_auth::TokenPipeline) plus routing parameters.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::StartupError;
use crate::providers::AclRule;

const DEV_SIGNING_SECRET: &str = "wharf-dev-secret";

/// Global configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to listen on.
    pub listen_port: u16,
    /// Token issuer.
    pub issuer: String,
    /// Token lifetime.
    pub token_lifetime: Duration,
    /// Path of the token endpoint.
    pub token_path: String,
    /// Path of the info endpoint.
    pub info_path: String,
    /// HS256 signing secret.
    pub signing_secret: String,
    /// `username → password` table for Basic authentication.
    pub users: HashMap<String, String>,
    /// Whether callers without credentials are accepted.
    pub allow_anonymous: bool,
    /// ACL rules, in order.
    pub acl: Vec<AclRule>,
    /// Deadline for each collaborator call.
    pub call_timeout: Option<Duration>,
    /// Pretty-print JSON response bodies.
    pub pretty_json: bool,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `WHARF_PORT` | `5001` | HTTP listen port |
    /// | `WHARF_ISSUER` | `wharf` | token issuer |
    /// | `WHARF_TOKEN_LIFETIME_SECS` | `300` | token lifetime |
    /// | `WHARF_TOKEN_PATH` | `/token` | token endpoint |
    /// | `WHARF_INFO_PATH` | `/info` | info endpoint |
    /// | `WHARF_SIGNING_SECRET` | dev secret | HS256 key |
    /// | `WHARF_USERS` | empty | `user:password,...` |
    /// | `WHARF_ALLOW_ANONYMOUS` | `true` | accept callers without credentials |
    /// | `WHARF_ACL` | empty | `account=type:name:actions;...` |
    /// | `WHARF_CALL_TIMEOUT_MS` | unset | per-call deadline |
    /// | `WHARF_PRETTY_JSON` | `false` | pretty-print bodies |
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StartupError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let listen_port = parse_var(&get, "WHARF_PORT")?.unwrap_or(5001);
        let issuer = get("WHARF_ISSUER").unwrap_or_else(|| "wharf".to_string());
        let token_lifetime =
            Duration::from_secs(parse_var(&get, "WHARF_TOKEN_LIFETIME_SECS")?.unwrap_or(300));
        let token_path = path_var(&get, "WHARF_TOKEN_PATH", "/token")?;
        let info_path = path_var(&get, "WHARF_INFO_PATH", "/info")?;
        let signing_secret =
            get("WHARF_SIGNING_SECRET").unwrap_or_else(|| DEV_SIGNING_SECRET.to_string());
        let users = get("WHARF_USERS").map(|v| parse_users(&v)).transpose()?.unwrap_or_default();
        let allow_anonymous = parse_var(&get, "WHARF_ALLOW_ANONYMOUS")?.unwrap_or(true);
        let acl = get("WHARF_ACL").map(|v| parse_acl(&v)).transpose()?.unwrap_or_default();
        let call_timeout = parse_var(&get, "WHARF_CALL_TIMEOUT_MS")?.map(Duration::from_millis);
        let pretty_json = parse_var(&get, "WHARF_PRETTY_JSON")?.unwrap_or(false);

        if token_path == info_path {
            return Err(StartupError::InvalidVar {
                var: "WHARF_INFO_PATH".to_string(),
                value: info_path,
                reason: "must differ from the token path".to_string(),
            });
        }

        Ok(Self {
            listen_port,
            issuer,
            token_lifetime,
            token_path,
            info_path,
            signing_secret,
            users,
            allow_anonymous,
            acl,
            call_timeout,
            pretty_json,
        })
    }

    /// Whether the development signing secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.signing_secret == DEV_SIGNING_SECRET
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, StartupError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| StartupError::InvalidVar {
                var: var.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn path_var(
    get: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: &str,
) -> Result<String, StartupError> {
    let path = get(var).unwrap_or_else(|| default.to_string());
    if !path.starts_with('/') {
        return Err(StartupError::InvalidVar {
            var: var.to_string(),
            value: path,
            reason: "must start with '/'".to_string(),
        });
    }
    Ok(path)
}

/// Parse `user:password,user:password`.
fn parse_users(value: &str) -> Result<HashMap<String, String>, StartupError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((user, password)) if !user.is_empty() => Ok((user.to_string(), password.to_string())),
            _ => Err(StartupError::InvalidUser(entry.to_string())),
        })
        .collect()
}

/// Parse `;`-separated ACL rules.
fn parse_acl(value: &str) -> Result<Vec<AclRule>, StartupError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_models::Scope;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, StartupError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.listen_port, 5001);
        assert_eq!(cfg.issuer, "wharf");
        assert_eq!(cfg.token_lifetime, Duration::from_secs(300));
        assert_eq!(cfg.token_path, "/token");
        assert_eq!(cfg.info_path, "/info");
        assert!(cfg.users.is_empty());
        assert!(cfg.allow_anonymous);
        assert!(cfg.acl.is_empty());
        assert!(cfg.call_timeout.is_none());
        assert!(!cfg.pretty_json);
        assert!(cfg.uses_dev_secret());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            ("WHARF_PORT", "8080"),
            ("WHARF_ISSUER", "https://auth.example.com"),
            ("WHARF_TOKEN_LIFETIME_SECS", "60"),
            ("WHARF_TOKEN_PATH", "/v2/token"),
            ("WHARF_INFO_PATH", "/v2/info"),
            ("WHARF_SIGNING_SECRET", "s3cret"),
            ("WHARF_USERS", "alice:pw1, bob:p:w2"),
            ("WHARF_ALLOW_ANONYMOUS", "false"),
            ("WHARF_ACL", "alice=repository:alice/*:pull,push; *=repository:public/*:pull"),
            ("WHARF_CALL_TIMEOUT_MS", "1500"),
            ("WHARF_PRETTY_JSON", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.listen_port, 8080);
        assert_eq!(cfg.issuer, "https://auth.example.com");
        assert_eq!(cfg.token_lifetime, Duration::from_secs(60));
        assert_eq!(cfg.token_path, "/v2/token");
        assert_eq!(cfg.users["alice"], "pw1");
        assert_eq!(cfg.users["bob"], "p:w2");
        assert!(!cfg.allow_anonymous);
        assert_eq!(cfg.acl.len(), 2);
        assert!(cfg.acl[1].covers(None, &Scope::parse("repository:public/x:pull").unwrap()));
        assert_eq!(cfg.call_timeout, Some(Duration::from_millis(1500)));
        assert!(cfg.pretty_json);
        assert!(!cfg.uses_dev_secret());
    }

    #[test]
    fn malformed_values_are_startup_errors() {
        assert!(matches!(
            config(&[("WHARF_PORT", "http")]),
            Err(StartupError::InvalidVar { .. })
        ));
        assert!(matches!(
            config(&[("WHARF_ALLOW_ANONYMOUS", "yes")]),
            Err(StartupError::InvalidVar { .. })
        ));
        assert!(matches!(
            config(&[("WHARF_USERS", "alice")]),
            Err(StartupError::InvalidUser(_))
        ));
        assert!(matches!(
            config(&[("WHARF_ACL", "alice=repository:foo")]),
            Err(StartupError::InvalidAclRule { .. })
        ));
        assert!(matches!(
            config(&[("WHARF_TOKEN_PATH", "token")]),
            Err(StartupError::InvalidVar { .. })
        ));
        assert!(matches!(
            config(&[("WHARF_TOKEN_PATH", "/x"), ("WHARF_INFO_PATH", "/x")]),
            Err(StartupError::InvalidVar { .. })
        ));
    }
}
