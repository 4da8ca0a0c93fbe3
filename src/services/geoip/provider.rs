//! GeoIP Provider 抽象层
//!
//! 统一的地理查询接口：主提供方 → 可选精化 → 次级提供方回退。
//! 所有失败都吞掉降级为 None，调用方必须容忍空结果。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, info, trace};

use super::external_api::{IpApiProvider, IpWhoProvider};
use super::refine::ReverseGeocoder;
use crate::config::AnalyticsConfig;
use crate::utils::ip::is_private_or_local;

/// GeoIP 缓存 TTL（15 分钟）——同一会话的重复事件不重复出站查询
const GEOIP_CACHE_TTL_SECS: u64 = 15 * 60;
/// GeoIP 缓存最大容量
const GEOIP_CACHE_MAX_CAPACITY: u64 = 10_000;

/// 标准化的地理位置记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoRecord {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// 查询 IP 地址的地理位置
    async fn lookup(&self, ip: &str) -> Option<GeoRecord>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 统一 GeoIP 解析器
///
/// 有序提供方链：主提供方命中后做可选的反向地理编码精化，
/// 主提供方失败则逐个回退到次级提供方（不精化），全部失败返回 None。
/// 单个提供方内不重试。结果按 IP 做短 TTL 缓存（含负缓存），
/// 并发查询同一 IP 只发一次请求。
pub struct GeoResolver {
    primary: Arc<dyn GeoLookup>,
    fallbacks: Vec<Arc<dyn GeoLookup>>,
    refiner: Option<ReverseGeocoder>,
    /// IP → GeoRecord 缓存（Option 用于负缓存）
    cache: Cache<String, Option<GeoRecord>>,
}

impl GeoResolver {
    /// 根据 AnalyticsConfig 初始化
    pub fn new(config: &AnalyticsConfig) -> Self {
        let refiner = config
            .geocoding_api_key
            .as_ref()
            .map(|key| ReverseGeocoder::new(key));
        if refiner.is_some() {
            info!("GeoIP: reverse-geocode refinement enabled");
        } else {
            debug!("GeoIP: no geocoding API key configured, refinement disabled");
        }

        Self::with_providers(
            Arc::new(IpApiProvider::new(&config.geoip_primary_url)),
            vec![Arc::new(IpWhoProvider::new(&config.geoip_fallback_url))],
            refiner,
        )
    }

    /// 显式注入提供方链（测试用 fake 从这里进）
    pub fn with_providers(
        primary: Arc<dyn GeoLookup>,
        fallbacks: Vec<Arc<dyn GeoLookup>>,
        refiner: Option<ReverseGeocoder>,
    ) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(GEOIP_CACHE_TTL_SECS))
            .max_capacity(GEOIP_CACHE_MAX_CAPACITY)
            .build();

        info!("GeoIP: initialized with primary provider {}", primary.name());
        Self {
            primary,
            fallbacks,
            refiner,
            cache,
        }
    }

    /// 查询 IP 地理位置
    ///
    /// 私有 / loopback / 不可解析地址立即返回 None，不产生出站调用。
    pub async fn resolve(&self, ip: &str) -> Option<GeoRecord> {
        let Ok(addr) = ip.parse::<std::net::IpAddr>() else {
            trace!("GeoIP: unparseable address \"{}\", skipping lookup", ip);
            return None;
        };
        if is_private_or_local(&addr) {
            trace!("GeoIP: private/local address {}, skipping lookup", ip);
            return None;
        }

        // get_with 自带 singleflight 语义：
        // 同一 key 的并发调用只执行一次闭包，其他等待结果
        self.cache
            .get_with(ip.to_string(), async {
                trace!("GeoIP: cache miss for {}, querying providers", ip);
                self.resolve_uncached(ip).await
            })
            .await
    }

    async fn resolve_uncached(&self, ip: &str) -> Option<GeoRecord> {
        // 主提供方：命中后做可选精化
        if let Some(mut record) = self.primary.lookup(ip).await {
            if let Some(ref refiner) = self.refiner
                && let (Some(lat), Some(lon)) = (record.latitude, record.longitude)
                && let Some(refined) = refiner.reverse(lat, lon).await
            {
                // 精化值可用时覆盖 country/city/region，坐标保持主结果
                if refined.country.is_some() {
                    record.country = refined.country;
                }
                if refined.city.is_some() {
                    record.city = refined.city;
                }
                if refined.region.is_some() {
                    record.region = refined.region;
                }
            }
            return Some(record);
        }

        // 次级提供方：同样的请求形状，不精化
        for provider in &self.fallbacks {
            debug!(
                "GeoIP: primary lookup failed for {}, trying {}",
                ip,
                provider.name()
            );
            if let Some(record) = provider.lookup(ip).await {
                return Some(record);
            }
        }

        debug!("GeoIP: all providers failed for {}", ip);
        None
    }
}
