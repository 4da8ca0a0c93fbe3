//! User-Agent 解析
//!
//! 客户端未上报设备字段时，服务端用 woothee 从 User-Agent 头解析
//! 浏览器 / 操作系统 / 设备类别作为回退。

use once_cell::sync::Lazy;
use woothee::parser::Parser;

static UA_PARSER: Lazy<Parser> = Lazy::new(Parser::new);

/// 解析出的设备信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
}

/// 将 woothee 的 category 归一化为站点口径的设备类型
fn normalize_category(category: &str) -> Option<String> {
    match category {
        "pc" => Some("desktop".to_string()),
        "smartphone" | "mobilephone" => Some("mobile".to_string()),
        "crawler" => Some("bot".to_string()),
        "appliance" | "misc" => Some("other".to_string()),
        _ => None,
    }
}

/// 解析 User-Agent 字符串
pub fn parse_user_agent(ua: &str) -> DeviceInfo {
    let Some(result) = UA_PARSER.parse(ua) else {
        return DeviceInfo::default();
    };

    DeviceInfo {
        device_type: normalize_category(result.category),
        browser: if result.name != "UNKNOWN" {
            Some(result.name.to_string())
        } else {
            None
        },
        os: if result.os != "UNKNOWN" {
            Some(result.os.to_string())
        } else {
            None
        },
    }
}
