pub mod ip;
pub mod useragent;

pub use ip::{extract_client_ip, extract_forwarded_ip_from_headers, is_private_or_local};
pub use useragent::{DeviceInfo, parse_user_agent};
