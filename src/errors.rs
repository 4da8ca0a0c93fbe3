use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum AtelierError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    GeoLookup(String),
    Notification(String),
    Configuration(String),
}

impl AtelierError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AtelierError::DatabaseConfig(_) => "E001",
            AtelierError::DatabaseConnection(_) => "E002",
            AtelierError::DatabaseOperation(_) => "E003",
            AtelierError::Validation(_) => "E004",
            AtelierError::NotFound(_) => "E005",
            AtelierError::Serialization(_) => "E006",
            AtelierError::GeoLookup(_) => "E007",
            AtelierError::Notification(_) => "E008",
            AtelierError::Configuration(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AtelierError::DatabaseConfig(_) => "Database Configuration Error",
            AtelierError::DatabaseConnection(_) => "Database Connection Error",
            AtelierError::DatabaseOperation(_) => "Database Operation Error",
            AtelierError::Validation(_) => "Validation Error",
            AtelierError::NotFound(_) => "Resource Not Found",
            AtelierError::Serialization(_) => "Serialization Error",
            AtelierError::GeoLookup(_) => "Geolocation Lookup Error",
            AtelierError::Notification(_) => "Notification Error",
            AtelierError::Configuration(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AtelierError::DatabaseConfig(msg) => msg,
            AtelierError::DatabaseConnection(msg) => msg,
            AtelierError::DatabaseOperation(msg) => msg,
            AtelierError::Validation(msg) => msg,
            AtelierError::NotFound(msg) => msg,
            AtelierError::Serialization(msg) => msg,
            AtelierError::GeoLookup(msg) => msg,
            AtelierError::Notification(msg) => msg,
            AtelierError::Configuration(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码（管理端 JSON 错误响应使用）
    pub fn http_status(&self) -> StatusCode {
        match self {
            AtelierError::Validation(_) => StatusCode::BAD_REQUEST,
            AtelierError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 启动日志）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AtelierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AtelierError {}

// 便捷的构造函数
impl AtelierError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        AtelierError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AtelierError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AtelierError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AtelierError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AtelierError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        AtelierError::Serialization(msg.into())
    }

    pub fn geo_lookup<T: Into<String>>(msg: T) -> Self {
        AtelierError::GeoLookup(msg.into())
    }

    pub fn notification<T: Into<String>>(msg: T) -> Self {
        AtelierError::Notification(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        AtelierError::Configuration(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AtelierError {
    fn from(err: sea_orm::DbErr) -> Self {
        AtelierError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for AtelierError {
    fn from(err: std::io::Error) -> Self {
        AtelierError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for AtelierError {
    fn from(err: serde_json::Error) -> Self {
        AtelierError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AtelierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(AtelierError::validation("x").code(), "E004");
        assert_eq!(AtelierError::not_found("x").code(), "E005");
        assert_eq!(AtelierError::geo_lookup("x").code(), "E007");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AtelierError::validation("missing email").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AtelierError::not_found("no such label").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AtelierError::database_operation("boom").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = AtelierError::validation("email is required");
        assert_eq!(err.to_string(), "Validation Error: email is required");
    }

    #[test]
    fn test_from_db_err() {
        let err: AtelierError = sea_orm::DbErr::Custom("pool exhausted".into()).into();
        assert!(matches!(err, AtelierError::DatabaseOperation(_)));
    }
}
