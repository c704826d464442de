use serde::{Deserialize, Serialize};

/// Connection metadata with secrets redacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Redact the password of a connection URL and extract loggable metadata.
///
/// SQLite URLs (`sqlite::memory:`, `sqlite://path.db`) carry no credentials;
/// the path is reported as the database.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let mut out = RedactedConnection {
        engine: None,
        user: None,
        host: None,
        port: None,
        database: None,
        redacted: conn.to_string(),
    };

    let Some((scheme, rest)) = conn.split_once(':') else {
        return out;
    };
    out.engine = Some(scheme.to_string());

    let Some(authority_and_path) = rest.strip_prefix("//") else {
        let path = rest.split('?').next().unwrap_or("");
        out.database = Some(path.to_string()).filter(|path| !path.is_empty());
        return out;
    };

    let (location, query) = match authority_and_path.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (authority_and_path, None),
    };
    let (authority, path) = location.split_once('/').unwrap_or((location, ""));

    let (credentials, host_port) = match authority.rsplit_once('@') {
        Some((credentials, host_port)) => (Some(credentials), host_port),
        None => (None, authority),
    };

    let credentials = credentials.map(|credentials| match credentials.split_once(':') {
        Some((user, _)) => {
            out.user = Some(user.to_string());
            format!("{user}:***")
        }
        None => {
            out.user = Some(credentials.to_string());
            credentials.to_string()
        }
    });

    match host_port.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => {
            out.host = Some(host.to_string());
            out.port = port.parse().ok();
        }
        _ if !host_port.is_empty() => out.host = Some(host_port.to_string()),
        _ => {}
    }

    if !path.is_empty() {
        out.database = Some(path.to_string());
    }

    let mut redacted = format!("{scheme}://");
    if let Some(credentials) = credentials {
        redacted.push_str(&credentials);
        redacted.push('@');
    }
    redacted.push_str(host_port);
    if !path.is_empty() {
        redacted.push('/');
        redacted.push_str(path);
    }
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&redact_query(query));
    }
    out.redacted = redacted;
    out
}

fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pass" | "pwd" | "token" | "api_key" | "apikey"
    )
}
