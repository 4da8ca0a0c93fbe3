//! 入口分类
//!
//! 会话开始时推断访客来路：UTM 参数优先，其次按 referrer 主机名
//! 匹配已知搜索引擎 / 社交网络子串。只推断一次，结果随 session_start
//! 事件上报并写入订阅记录。

use serde::Serialize;
use url::Url;

/// 已知搜索引擎主机名子串及其查询参数名
const SEARCH_ENGINES: [(&str, &str); 6] = [
    ("google", "q"),
    ("bing", "q"),
    ("duckduckgo", "q"),
    ("yahoo", "p"),
    ("baidu", "wd"),
    ("yandex", "text"),
];

/// 已知社交网络主机名子串
const SOCIAL_NETWORKS: [&str; 10] = [
    "instagram",
    "facebook",
    "twitter",
    "x.com",
    "t.co",
    "linkedin",
    "pinterest",
    "tiktok",
    "weibo",
    "reddit",
];

/// 访客入口分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPoint {
    Direct,
    Search {
        engine: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
    Social {
        network: String,
    },
    Referral {
        host: String,
    },
    Email,
    Other,
}

impl EntryPoint {
    /// 存储口径的短标签
    pub fn label(&self) -> &'static str {
        match self {
            EntryPoint::Direct => "direct",
            EntryPoint::Search { .. } => "search",
            EntryPoint::Social { .. } => "social",
            EntryPoint::Referral { .. } => "referral",
            EntryPoint::Email => "email",
            EntryPoint::Other => "other",
        }
    }
}

/// 从 URL 查询串提取指定参数（已解码）
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// 提取原始查询参数并做 percent 解码（搜索词可能包含 + 和 %XX）
fn decoded_query_param(url: &Url, name: &str) -> Option<String> {
    let raw = url.query()?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then_some(v)
    })?;
    if raw.is_empty() {
        return None;
    }
    let spaced = raw.replace('+', " ");
    Some(
        urlencoding::decode(&spaced)
            .map(|d| d.into_owned())
            .unwrap_or(spaced),
    )
}

/// 按 UTM 参数分类（优先级高于 referrer 推断）
fn classify_by_utm(page: &Url) -> Option<EntryPoint> {
    let source = query_param(page, "utm_source")?;
    let medium = query_param(page, "utm_medium").unwrap_or_default();
    let source_lower = source.to_lowercase();

    if medium.eq_ignore_ascii_case("email") || source_lower == "newsletter" {
        return Some(EntryPoint::Email);
    }
    if medium.eq_ignore_ascii_case("social")
        || SOCIAL_NETWORKS.iter().any(|n| source_lower.contains(n))
    {
        return Some(EntryPoint::Social { network: source });
    }
    if SEARCH_ENGINES
        .iter()
        .any(|(engine, _)| source_lower.contains(engine))
    {
        return Some(EntryPoint::Search {
            engine: source,
            query: None,
        });
    }
    Some(EntryPoint::Other)
}

/// 按 referrer 主机名分类
fn classify_by_referrer(referrer: &str) -> EntryPoint {
    let Ok(url) = Url::parse(referrer) else {
        return EntryPoint::Other;
    };
    let Some(host) = url.host_str().map(|h| h.to_lowercase()) else {
        return EntryPoint::Other;
    };

    for (engine, param) in SEARCH_ENGINES {
        if host.contains(engine) {
            return EntryPoint::Search {
                engine: engine.to_string(),
                query: decoded_query_param(&url, param),
            };
        }
    }

    for network in SOCIAL_NETWORKS {
        if host.contains(network) {
            return EntryPoint::Social {
                network: network.to_string(),
            };
        }
    }

    if host.starts_with("mail.") || host.contains("webmail") {
        return EntryPoint::Email;
    }

    EntryPoint::Referral { host }
}

/// 入口分类：UTM 参数优先于 referrer 推断
pub fn classify_entry(page_url: Option<&str>, referrer: Option<&str>) -> EntryPoint {
    if let Some(page) = page_url
        && let Ok(url) = Url::parse(page)
        && let Some(entry) = classify_by_utm(&url)
    {
        return entry;
    }

    match referrer {
        None => EntryPoint::Direct,
        Some(r) if r.trim().is_empty() => EntryPoint::Direct,
        Some(r) => classify_by_referrer(r),
    }
}
