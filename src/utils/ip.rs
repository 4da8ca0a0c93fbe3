//! IP 地址处理工具
//!
//! 提供统一的客户端 IP 提取功能：
//! - 代理头提取（X-Forwarded-For 首项 → X-Real-IP → 连接 IP → "unknown"）
//! - 私有 IP / localhost 检测（地理解析前置短路用）

use std::net::IpAddr;

use actix_web::HttpRequest;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            // IPv6 私有地址：
            // - fc00::/7 (ULA, RFC 4193): fc00::/8 + fd00::/8
            // - fe80::/10 (Link-local)
            // - ::1 (Loopback)
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7 (包含 fc00 和 fd00)
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10 (link-local)
        }
    }
}

/// 从 HeaderMap 提取转发的 IP（X-Forwarded-For 或 X-Real-IP）
pub fn extract_forwarded_ip_from_headers(
    headers: &actix_web::http::header::HeaderMap,
) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            // 其次 X-Real-IP
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// 从 HttpRequest 提取客户端 IP
///
/// 追踪端点的既定链路：X-Forwarded-For 首项 → X-Real-IP →
/// 连接对端地址 → 字面量 "unknown"。追踪路径从不因缺失 IP 失败。
pub fn extract_client_ip(req: &HttpRequest) -> String {
    if let Some(forwarded) = extract_forwarded_ip_from_headers(req.headers()) {
        return forwarded;
    }

    req.connection_info()
        .peer_addr()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_is_private_or_local_ipv4() {
        // 私有地址
        assert!(is_private_or_local(&"10.0.0.5".parse().unwrap()));
        assert!(is_private_or_local(&"172.16.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"192.168.0.1".parse().unwrap()));
        // localhost
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        // 公网地址
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_or_local(&"1.1.1.1".parse().unwrap()));
    }

    #[test]
    fn test_is_private_or_local_ipv6() {
        // localhost
        assert!(is_private_or_local(&"::1".parse().unwrap()));
        // ULA (fc00::/7)
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(is_private_or_local(&"fc00::1".parse().unwrap()));
        // Link-local (fe80::/10)
        assert!(is_private_or_local(&"fe80::1".parse().unwrap()));
        // 公网地址
        assert!(!is_private_or_local(
            &"2001:4860:4860::8888".parse().unwrap()
        ));
    }

    #[test]
    fn test_forwarded_ip_prefers_xff_first_entry() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.7, 70.41.3.18, 150.172.238.178"))
            .insert_header(("x-real-ip", "198.51.100.1"))
            .to_http_request();

        assert_eq!(
            extract_forwarded_ip_from_headers(req.headers()).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_forwarded_ip_falls_back_to_real_ip() {
        let req = TestRequest::default()
            .insert_header(("x-real-ip", "198.51.100.1"))
            .to_http_request();

        assert_eq!(
            extract_forwarded_ip_from_headers(req.headers()).as_deref(),
            Some("198.51.100.1")
        );
    }

    #[test]
    fn test_extract_client_ip_unknown_when_nothing_available() {
        let req = TestRequest::default().to_http_request();
        // TestRequest 没有 peer_addr，也没有转发头
        assert_eq!(extract_client_ip(&req), "unknown");
    }

    #[test]
    fn test_extract_client_ip_uses_peer_addr() {
        let req = TestRequest::default()
            .peer_addr("93.184.216.34:443".parse().unwrap())
            .to_http_request();
        assert_eq!(extract_client_ip(&req), "93.184.216.34");
    }
}
