use std::{net::IpAddr, str::FromStr, sync::OnceLock};

use actix_web::{
    http::header::{HeaderMap, AUTHORIZATION},
    HttpRequest,
};
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most entry is the originating client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}

fn forwarded_for(header: &str) -> Option<IpAddr> {
    static FOR_PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = FOR_PATTERN.get_or_init(|| Regex::new(r#"for="?(?P<ip>[^;,"]+)"#).expect("Forwarded pattern is valid"));
    re.captures(header).and_then(|caps| caps.name("ip")).and_then(|m| IpAddr::from_str(m.as_str()).ok())
}

/// Extracts the token from an `Authorization: Bearer <token>` header. The scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn bearer_tokens() {
        let req = TestRequest::default().insert_header((AUTHORIZATION, "Bearer s3cret")).to_http_request();
        assert_eq!(bearer_token(req.headers()), Some("s3cret"));
        let req = TestRequest::default().insert_header((AUTHORIZATION, "bearer  s3cret ")).to_http_request();
        assert_eq!(bearer_token(req.headers()), Some("s3cret"));
        let req = TestRequest::default().insert_header((AUTHORIZATION, "Basic dXNlcjpwYXNz")).to_http_request();
        assert_eq!(bearer_token(req.headers()), None);
        let req = TestRequest::default().insert_header((AUTHORIZATION, "Bearer")).to_http_request();
        assert_eq!(bearer_token(req.headers()), None);
        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_token(req.headers()), None);
    }

    #[test]
    fn remote_ip_sources() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.2"))
            .insert_header(("Forwarded", "for=198.51.100.17;proto=https"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, true), Some("203.0.113.7".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("198.51.100.17".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, false), Some("10.0.0.1".parse().unwrap()));
    }
}
