use wizard_protocol::ConnectAuth;

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "WIZARD_API_KEY";

/// Resolve gateway credentials.
///
/// Priority: explicit API key > config file > `WIZARD_API_KEY` > no auth
/// (local instances).
pub fn resolve_auth(explicit: Option<&str>, configured: Option<&str>) -> ConnectAuth {
    resolve_auth_with(explicit, configured, |name| std::env::var(name).ok())
}

fn resolve_auth_with(
    explicit: Option<&str>,
    configured: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConnectAuth {
    let present = |key: &str| !key.trim().is_empty();
    let api_key = explicit
        .filter(|key| present(*key))
        .or(configured.filter(|key| present(*key)))
        .map(String::from)
        .or_else(|| lookup(API_KEY_ENV).filter(|key| present(key.as_str())));
    ConnectAuth {
        api_key,
        password: None,
        token: None,
    }
}
