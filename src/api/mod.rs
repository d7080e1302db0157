pub mod comprobantes;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api/comprobantes",
        comprobantes::handlers::create_comprobantes_router(),
    )
}
