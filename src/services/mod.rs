//! Service layer for business logic
//!
//! This module provides unified business logic shared between the HTTP
//! API and the library surface (collector transports, tests).

pub mod geoip;
mod notify;
mod reporting;
mod visitor_service;

pub use geoip::{GeoLookup, GeoRecord, GeoResolver};
pub use notify::{NotificationDispatcher, VisitorNotifier};
pub use reporting::{
    CityCount, CountryCount, GeoBreakdown, MapPoint, PaginationInfo, ReportingService,
    SubscriptionFilter, VisitorFilter, VisitorGeoStat,
};
pub use visitor_service::VisitorService;
