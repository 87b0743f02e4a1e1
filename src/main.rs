use actix_web::{web, App, HttpResponse, HttpServer};
use chatboard_service::openapi::ApiDoc;
use chatboard_service::{
    config, db, error, logging,
    middleware::auth::JwtAuth,
    redis_client::RedisClient,
    routes,
    services::attachment_store::AttachmentStore,
    state::AppState,
    websocket::{pubsub::start_psub_listener, ConnectionRegistry},
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn openapi_json(
    doc: web::Data<utoipa::openapi::OpenApi>,
) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Treat migration failures as fatal - the schema must be in sync
    chatboard_service::migrations::run_all(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("database migrations failed: {}", e)))?;

    let redis = RedisClient::from_url(&cfg.redis_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;
    let registry = ConnectionRegistry::new();
    let attachments = AttachmentStore::new(cfg.attachment_root.clone()).await?;

    // Pub/sub needs a dedicated connection, separate from the multiplexed
    // manager the handlers publish through.
    let psub_client = redis::Client::open(cfg.redis_url.as_str())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;
    let psub_registry = registry.clone();
    let _psub_listener: JoinHandle<()> = tokio::spawn(async move {
        if let Err(e) = start_psub_listener(psub_client, psub_registry).await {
            tracing::error!(error = %e, "redis pub/sub listener failed");
        }
    });

    let state = AppState {
        db: db.clone(),
        registry: registry.clone(),
        redis: redis.clone(),
        config: cfg.clone(),
        attachments,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chatboard-service");

    let jwt_secret = cfg.jwt_secret.clone();
    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api/v1/openapi.json", openapi_doc.clone()),
            )
            .route("/api/v1/openapi.json", web::get().to(openapi_json))
            .app_data(web::Data::new(state.clone()))
            .wrap(JwtAuth::new(jwt_secret.clone()))
            .wrap(cors)
            .service(routes::auths::signup)
            .service(routes::auths::login)
            .service(routes::users::contacts)
            .service(routes::conversations::get_history)
            .service(routes::conversations::get_info)
            .service(routes::conversations::create_group)
            .service(routes::conversations::update_group)
            .service(routes::groups::add_member)
            .service(routes::groups::remove_member)
            .service(routes::messages::send_message)
            .service(routes::messages::list_by_conversation)
            .service(routes::messages::list_by_contact)
            .service(routes::messages::delete_message)
            .service(routes::files::get_attachment)
            .service(routes::files::get_avatar)
            .service(routes::wsroute::ws_handler)
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(e.to_string()))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
