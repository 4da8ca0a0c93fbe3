use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;

use atelier::api::middleware::{AdminAuth, RequestIdMiddleware};
use atelier::api::services::admin::routes::admin_v1_routes;
use atelier::api::services::track::track_routes;
use atelier::api::services::{AppStartTime, health_routes};
use atelier::config::AppConfig;
use atelier::services::{
    GeoResolver, NotificationDispatcher, ReportingService, VisitorNotifier, VisitorService,
};
use atelier::storage::SeaOrmStorage;
use atelier::system::init_logging;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 记录程序启动时间
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    dotenv().ok();
    let config = AppConfig::from_env();

    // 日志 guard 必须存活到进程结束
    let _log_guard = init_logging(&config.logging);

    // 显式构造存储：连接 + 迁移，失败直接退出
    let storage = match SeaOrmStorage::new(&config.database.database_url, config.database.pool_size)
        .await
    {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };
    info!("Using storage backend: {}", storage.backend_name());

    // 组装服务：全部显式注入，无全局单例
    let resolver = Arc::new(GeoResolver::new(&config.analytics));
    let dispatcher = Arc::new(NotificationDispatcher::new(&config.notify));
    let visitor_service = VisitorService::new(
        Arc::clone(&storage),
        Arc::clone(&dispatcher) as Arc<dyn VisitorNotifier>,
    );
    let reporting = ReportingService::new(Arc::clone(&storage));

    let admin_prefix = config.server.admin_prefix.clone();
    if config.server.admin_token.is_empty() {
        info!("Admin API is disabled (ADMIN_TOKEN not set)");
    } else {
        info!("Admin API available at: {}", admin_prefix);
    }
    if dispatcher.webhook_configured() {
        info!("Visitor/lead notifications enabled");
    } else {
        info!("Notifications disabled (no webhook configured)");
    }

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server at http://{}", bind_address);

    let workers = config.server.workers;
    let cors_origin = config.server.cors_allowed_origin.clone();
    let admin_token = config.server.admin_token.clone();
    let storage_for_shutdown = Arc::clone(&storage);

    // Start the HTTP server
    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
            None => Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        };

        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .app_data(web::Data::new(Arc::clone(&storage)))
            .app_data(web::Data::new(Arc::clone(&resolver)))
            .app_data(web::Data::new(Arc::clone(&dispatcher)))
            .app_data(web::Data::new(visitor_service.clone()))
            .app_data(web::Data::new(reporting.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .service(track_routes())
            .service(
                web::scope(&admin_prefix)
                    .wrap(AdminAuth::new(admin_token.clone()))
                    .service(admin_v1_routes()),
            )
            .service(health_routes())
    })
    .workers(workers)
    .bind(bind_address)?
    .run()
    .await?;

    // 显式关闭存储连接池
    (*storage_for_shutdown).clone().close().await;

    Ok(())
}
