use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use hotspot_billing::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{MpesaClient, PaymentGateway},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool, config.database.reset_on_startup)
        .await
        .expect("Failed to run database migrations");

    let plan_service = PlanService::new(pool.clone());
    plan_service
        .seed_default_plans()
        .await
        .expect("Failed to seed default plans");

    let jwt_service = JwtService::from_config(&config.session);

    let mpesa_client =
        MpesaClient::new(config.mpesa.clone()).expect("Failed to build M-Pesa client");
    // warm the token cache; payments still retry on demand if this fails
    if let Err(e) = mpesa_client.access_token().await {
        log::error!("M-Pesa authentication failed at startup: {e}");
    }
    let gateway: Arc<dyn PaymentGateway> = Arc::new(mpesa_client);

    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let user_service = UserService::new(pool.clone());
    let payment_service = PaymentService::new(pool.clone(), gateway);

    tasks::spawn_all(payment_service.clone(), &config.tasks);

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let session_config = config.session.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(session_config.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(plan_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .configure(swagger_config)
            .configure(handlers::index_config)
            .configure(handlers::callback_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::plan_config)
                    .configure(handlers::dashboard_config)
                    .configure(handlers::payment_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
