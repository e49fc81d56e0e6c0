use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;

/// Address a submission is attributed to for rate limiting.
///
/// `X-Forwarded-For` is only honoured when the direct peer is one of the
/// trusted proxies. Hops are read right to left, since each proxy appends
/// the address it saw; the first hop that is not a trusted proxy wins.
/// Everything left of that hop was supplied by the client and is ignored.
/// An unparseable hop stops the walk and the direct peer is used.
pub fn resolve(headers: &HeaderMap, peer: IpAddr, trusted_proxies: &[IpNet]) -> IpAddr {
    let is_trusted = |ip: &IpAddr| trusted_proxies.iter().any(|net| net.contains(ip));

    if !is_trusted(&peer) {
        return peer;
    }

    let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return peer;
    };

    for hop in xff.rsplit(',').map(str::trim) {
        let Ok(ip) = hop.parse::<IpAddr>() else {
            return peer;
        };
        if !is_trusted(&ip) {
            return ip;
        }
    }
    peer
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn xff(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn ignores_forwarded_header_without_trusted_proxies() {
        let peer: IpAddr = "198.51.100.4".parse().unwrap();
        assert_eq!(resolve(&xff("203.0.113.9"), peer, &[]), peer);
    }

    #[test]
    fn ignores_forwarded_header_from_untrusted_peer() {
        let peer: IpAddr = "198.51.100.4".parse().unwrap();
        let trusted: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap()];
        assert_eq!(resolve(&xff("203.0.113.9"), peer, &trusted), peer);
    }

    #[test]
    fn uses_rightmost_untrusted_hop_behind_proxy() {
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let trusted: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap()];
        let headers = xff("203.0.113.9, 198.51.100.4, 10.0.0.5");
        assert_eq!(
            resolve(&headers, peer, &trusted),
            "198.51.100.4".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn client_supplied_leftmost_hops_are_ignored() {
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let trusted: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap()];
        let real: IpAddr = "198.51.100.4".parse().unwrap();

        for spoofed in [
            "203.0.113.1, 198.51.100.4",
            "203.0.113.2, 198.51.100.4",
            "10.0.0.9, 198.51.100.4",
        ] {
            assert_eq!(resolve(&xff(spoofed), peer, &trusted), real);
        }
    }

    #[test]
    fn garbage_right_of_real_hop_falls_back_to_peer() {
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let trusted: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap()];
        assert_eq!(resolve(&xff("198.51.100.4, unknown"), peer, &trusted), peer);
    }

    #[test]
    fn falls_back_to_peer_on_garbage() {
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let trusted: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap()];
        assert_eq!(resolve(&xff("unknown, nonsense"), peer, &trusted), peer);
        assert_eq!(resolve(&HeaderMap::new(), peer, &trusted), peer);
    }
}
