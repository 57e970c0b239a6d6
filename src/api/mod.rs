mod handlers;
mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;

pub use middleware::{ClientAddress, RateLimiter, SecurityConfig};

/// Router with authentication and rate limiting disabled.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, SecurityConfig::disabled())
}

pub fn create_router_with_config(db: Database, config: SecurityConfig) -> Router {
    let mut protected = Router::new()
        // Books
        .route("/books", get(handlers::list_books).post(handlers::create_book))
        .route(
            "/books/{id}",
            get(handlers::get_book)
                .put(handlers::put_book)
                .delete(handlers::delete_book),
        )
        // Community feed
        .route(
            "/community",
            get(handlers::list_shared_manifestations).post(handlers::create_shared_manifestation),
        )
        .route(
            "/community/{id}",
            get(handlers::get_shared_manifestation)
                .put(handlers::put_shared_manifestation)
                .delete(handlers::delete_shared_manifestation),
        )
        // Weekly rotation
        .route(
            "/weekly",
            get(handlers::get_weekly_state).put(handlers::put_weekly_state),
        )
        // Inventory and seeds
        .route(
            "/inventory",
            get(handlers::list_inventory).post(handlers::create_inventory_item),
        )
        .route(
            "/inventory/{id}",
            get(handlers::get_inventory_item)
                .put(handlers::put_inventory_item)
                .delete(handlers::delete_inventory_item),
        )
        .route("/seeds", get(handlers::list_seeds).post(handlers::create_seed))
        .route(
            "/seeds/{id}",
            get(handlers::get_seed)
                .put(handlers::put_seed)
                .delete(handlers::delete_seed),
        )
        // Journal
        .route(
            "/journal",
            get(handlers::list_journal_entries).post(handlers::create_journal_entry),
        )
        .route(
            "/journal/{id}",
            get(handlers::get_journal_entry)
                .put(handlers::put_journal_entry)
                .delete(handlers::delete_journal_entry),
        )
        // Quests
        .route("/quests", get(handlers::list_quests).post(handlers::create_quest))
        .route(
            "/quests/{id}",
            get(handlers::get_quest)
                .put(handlers::put_quest)
                .delete(handlers::delete_quest),
        )
        // Leaderboards
        .route(
            "/rankings/seeds",
            get(handlers::list_seed_rankings)
                .post(handlers::create_seed_ranking)
                .delete(handlers::clear_seed_rankings),
        )
        .route(
            "/rankings/streaks",
            get(handlers::list_streak_rankings)
                .post(handlers::create_streak_ranking)
                .delete(handlers::clear_streak_rankings),
        )
        // Export / import
        .route(
            "/snapshot",
            get(handlers::export_snapshot).put(handlers::import_snapshot),
        );

    if let Some(limiter) = config.rate_limiter.clone() {
        protected = protected.route_layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }
    if config.api_key.is_some() {
        protected = protected.route_layer(from_fn_with_state(
            config.clone(),
            middleware::auth_middleware,
        ));
    }

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(db)
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
