//! Environment-driven server configuration.

use std::collections::HashMap;
use std::net::SocketAddr;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Bearer token -> user id registry for the dashboard API.
    pub tokens: HashMap<String, String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// - `HEATHUB_ADDR`: bind address, default `0.0.0.0:4000`
    /// - `HEATHUB_API_TOKENS`: comma-separated `token:user` pairs
    pub fn from_env() -> anyhow::Result<Self> {
        let addr = std::env::var("HEATHUB_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".to_string());
        let bind_addr: SocketAddr = addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid HEATHUB_ADDR {addr:?}: {e}"))?;

        let tokens = match std::env::var("HEATHUB_API_TOKENS") {
            Ok(raw) => parse_tokens(&raw)?,
            Err(_) => HashMap::new(),
        };

        Ok(Self { bind_addr, tokens })
    }
}

fn parse_tokens(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (token, user_id) = pair
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("invalid token entry {pair:?}, expected token:user"))?;
        if token.is_empty() || user_id.is_empty() {
            anyhow::bail!("invalid token entry {pair:?}, expected token:user");
        }
        tokens.insert(token.to_string(), user_id.to_string());
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        let tokens = parse_tokens("abc:user-1, def:user-2").unwrap();
        assert_eq!(tokens.get("abc"), Some(&"user-1".to_string()));
        assert_eq!(tokens.get("def"), Some(&"user-2".to_string()));
    }

    #[test]
    fn test_parse_tokens_rejects_malformed() {
        assert!(parse_tokens("no-separator").is_err());
        assert!(parse_tokens(":user").is_err());
        assert!(parse_tokens("token:").is_err());
    }

    #[test]
    fn test_parse_tokens_empty() {
        assert!(parse_tokens("").unwrap().is_empty());
    }
}
