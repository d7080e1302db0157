use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;

use crate::api::comprobantes::{
    autorizacion_service::AutorizacionService,
    error_handling::ImportacionError,
    import_service::ImportService,
    models::{Ambiente, ImportarLoteRequest, ImportarUnaRequest, ImportarUnaResponse},
    repository::AlmacenVentasPg,
};

// ============================================================================
// HANDLER FUNCTIONS
// ============================================================================

/// Separa el texto del request en claves, una por línea. Las líneas en
/// blanco se ignoran.
pub fn parsear_claves(texto: &str) -> Vec<String> {
    texto
        .lines()
        .map(str::trim)
        .filter(|linea| !linea.is_empty())
        .map(String::from)
        .collect()
}

fn construir_servicio(
    app_state: &AppState,
) -> ImportService<AutorizacionService, AlmacenVentasPg> {
    ImportService::new(
        AutorizacionService::new(app_state.sri_config.clone()),
        AlmacenVentasPg::new(app_state.db_pool.clone()),
    )
}

/// POST /api/comprobantes/importar
///
/// Importa un lote de claves de acceso. Devuelve 200 con el resultado por
/// ítem cuando al menos una clave se importó; 422 con el mismo cuerpo
/// cuando ninguna lo logró.
pub async fn importar_lote_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ImportarLoteRequest>,
) -> Result<Response, ImportacionError> {
    let claves = parsear_claves(&request.claves);
    if claves.is_empty() {
        return Err(ImportacionError::ValidacionError {
            errores: vec!["Se requiere al menos una clave de acceso".to_string()],
        });
    }
    let ambiente = Ambiente::desde_token(request.ambiente.as_deref())?;

    info!(
        "Importación de lote solicitada: {} claves, empresa {}, usuario {}",
        claves.len(),
        request.empresa_id,
        request.usuario_id
    );

    let service = construir_servicio(&app_state);
    let resultado = service
        .importar_lote(&claves, request.empresa_id, request.usuario_id, ambiente)
        .await?;

    let status = if resultado.exitosos == 0 {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };

    Ok((status, ResponseJson(resultado)).into_response())
}

/// POST /api/comprobantes/importar-una
///
/// Importa exactamente una clave; cualquier fallo se devuelve como el error
/// específico en lugar de un resultado por ítem.
pub async fn importar_una_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ImportarUnaRequest>,
) -> Result<ResponseJson<ImportarUnaResponse>, ImportacionError> {
    let clave = request.clave.trim().to_string();
    if clave.is_empty() {
        return Err(ImportacionError::ValidacionError {
            errores: vec!["Se requiere la clave de acceso".to_string()],
        });
    }
    let ambiente = Ambiente::desde_token(request.ambiente.as_deref())?;

    info!(
        "Importación individual solicitada: clave {}, empresa {}",
        clave, request.empresa_id
    );

    let service = construir_servicio(&app_state);
    let venta_id = service
        .importar_una(&clave, request.empresa_id, request.usuario_id, ambiente)
        .await?;

    Ok(ResponseJson(ImportarUnaResponse {
        estado: "EXITOSO".to_string(),
        mensaje: "Comprobante importado correctamente".to_string(),
        clave_acceso: clave,
        venta_id,
    }))
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

pub async fn health_check_handler() -> Result<ResponseJson<serde_json::Value>, StatusCode> {
    Ok(ResponseJson(serde_json::json!({
        "status": "healthy",
        "service": "importacion_comprobantes",
        "timestamp": chrono::Utc::now(),
        "version": "1.0.0"
    })))
}

// ============================================================================
// ROUTER CONFIGURATION
// ============================================================================

use axum::{
    routing::{get, post},
    Router,
};

pub fn create_comprobantes_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/importar", post(importar_lote_handler))
        .route("/importar-una", post(importar_una_handler))
        .route("/health", get(health_check_handler))
}
