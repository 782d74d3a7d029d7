// region:    --- Imports
use campus_market::backend::{AuthProvider, Backend, GoTrueAuth};
use campus_market::handlers::{self, AppState};
use campus_market::scheduler::FeaturedRotator;
use campus_market::session::SessionContext;
use campus_market::views::HomeView;
use campus_market::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{:<12} --> configuration failed: {}", "Main", e);
            return Err(e.into());
        }
    };
    info!("{:<12} --> backend: {}", "Main", config.backend_url);

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    // auth provider -> session context, stores authenticate with its session
    let auth: Arc<dyn AuthProvider> = Arc::new(GoTrueAuth::new(
        http.clone(),
        config.auth_url(),
        config.anon_key.clone(),
    ));
    let backend = Backend::connect(&config, http, auth.subscribe());
    let session = Arc::new(SessionContext::start(auth));

    // home view with its first load and the featured carousel timer
    let home = Arc::new(HomeView::new());
    if let Err(e) = home.load(&backend, None, None).await {
        warn!("{:<12} --> initial listing load failed: {}", "Main", e);
    }
    let rotator = FeaturedRotator::start(Arc::clone(&home), config.featured_interval);

    let routes_all = handlers::routes(AppState {
        backend,
        session: Arc::clone(&session),
        home,
    });

    let listener = TcpListener::bind(&config.gateway_addr).await?;
    info!(
        "{:<12} --> Gateway: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("{:<12} --> Server error: {}", "Main", err);
    }

    rotator.stop();
    session.shutdown();
    info!("{:<12} --> shut down", "Main");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("{:<12} --> failed to listen for ctrl-c: {}", "Main", e);
    }
}
// endregion: --- Main
