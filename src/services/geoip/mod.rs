//! GeoIP 服务模块
//!
//! 提供 IP 地址地理位置查询功能，支持：
//! - 有序外部提供方回退（ip-api.com → ipwho.is）
//! - 可选的反向地理编码精化（配置 GEOCODING_API_KEY 时）
//! - 私有 / loopback 地址前置短路，不发出站请求

mod external_api;
mod provider;
mod refine;

pub use external_api::{IpApiProvider, IpWhoProvider};
pub use provider::{GeoLookup, GeoRecord, GeoResolver};
pub use refine::ReverseGeocoder;
