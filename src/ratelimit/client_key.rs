//! Client identification for rate limiting.

use std::net::IpAddr;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};

/// Derives the rate-limit identity of a request.
///
/// Precedence: auth credential, then `X-Forwarded-For` (first hop), then
/// `X-Real-IP`, then the socket peer address. Credentials are hashed so raw
/// tokens never sit in the window map.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(auth) = header_str(headers, AUTHORIZATION.as_str()) {
        let digest = Sha256::digest(auth.as_bytes());
        return format!("auth:{}", &hex::encode(digest)[..16]);
    }

    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());
    if let Some(addr) = forwarded {
        return format!("ip:{}", addr);
    }

    if let Some(addr) = header_str(headers, "x-real-ip") {
        return format!("ip:{}", addr);
    }

    match peer {
        Some(addr) => format!("ip:{}", addr),
        None => "ip:unknown".to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
