use actix_web::HttpRequest;

/// Identity used when the peer address is unknown (e.g. in-process test requests).
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Key a caller is rate limited under.
///
/// ## Sources:
/// - `trust_forwarded_for = false`: the TCP peer IP
/// - `trust_forwarded_for = true`: the client address from `Forwarded` /
///   `X-Forwarded-For`, falling back to the peer IP (only safe behind a proxy
///   that overwrites those headers)
pub fn client_identity(req: &HttpRequest, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return strip_port(addr).to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

/// `1.2.3.4:5678` → `1.2.3.4`; `[::1]:80` → `::1`; bare addresses pass through.
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match addr.rsplit_once(':') {
        // a single colon means host:port; more means a bare IPv6 address
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}
