use thiserror::Error;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use crate::api::comprobantes::models::RespuestaError;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum ImportacionError {
    #[error("Datos de entrada inválidos: {errores:?}")]
    ValidacionError { errores: Vec<String> },

    #[error("Clave de acceso inválida '{clave}': {detalle}")]
    ClaveInvalida { clave: String, detalle: String },

    #[error("Error de conexión con el servicio de autorización: {mensaje}")]
    ErrorConexion { mensaje: String },

    #[error("Timeout consultando el servicio de autorización")]
    Timeout,

    #[error("El servicio de autorización devolvió una respuesta vacía para la clave {clave}")]
    RespuestaVacia { clave: String },

    #[error("Comprobante no autorizado (estado {estado}): {mensajes}")]
    NoAutorizado { estado: String, mensajes: String },

    #[error("Error al interpretar el comprobante: {detalle}")]
    ErrorParseo { detalle: String },

    #[error("El comprobante con clave {clave} ya fue importado")]
    ComprobanteDuplicado {
        clave: String,
        venta_id: Option<i32>,
        usuario_original: Option<i32>,
    },

    #[error("Error de persistencia: {mensaje}")]
    ErrorPersistencia { mensaje: String },

    #[error("Error interno: {mensaje}")]
    ErrorInterno { mensaje: String },
}

impl ImportacionError {
    /// Código corto usado en respuestas y en el detalle por ítem de un lote.
    pub fn codigo(&self) -> &'static str {
        match self {
            ImportacionError::ValidacionError { .. } => "VALIDACION",
            ImportacionError::ClaveInvalida { .. } => "CLAVE_INVALIDA",
            ImportacionError::ErrorConexion { .. } => "ERROR_CONEXION",
            ImportacionError::Timeout => "TIMEOUT",
            ImportacionError::RespuestaVacia { .. } => "RESPUESTA_VACIA",
            ImportacionError::NoAutorizado { .. } => "NO_AUTORIZADO",
            ImportacionError::ErrorParseo { .. } => "ERROR_PARSEO",
            ImportacionError::ComprobanteDuplicado { .. } => "DUPLICADO",
            ImportacionError::ErrorPersistencia { .. } => "ERROR_PERSISTENCIA",
            ImportacionError::ErrorInterno { .. } => "ERROR_INTERNO",
        }
    }
}

// ============================================================================
// HTTP RESPONSE CONVERSION
// ============================================================================

impl IntoResponse for ImportacionError {
    fn into_response(self) -> Response {
        let (status, respuesta) = match &self {
            ImportacionError::ValidacionError { errores } => (
                StatusCode::BAD_REQUEST,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "Datos de entrada inválidos".to_string(),
                    detalle: None,
                    errores: Some(errores.clone()),
                },
            ),

            ImportacionError::ClaveInvalida { detalle, .. } => (
                StatusCode::BAD_REQUEST,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "La clave de acceso no tiene un formato válido".to_string(),
                    detalle: Some(detalle.clone()),
                    errores: None,
                },
            ),

            ImportacionError::ComprobanteDuplicado { clave, .. } => (
                StatusCode::CONFLICT,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "Este comprobante ya fue importado anteriormente".to_string(),
                    detalle: Some(clave.clone()),
                    errores: None,
                },
            ),

            ImportacionError::ErrorConexion { mensaje } => (
                StatusCode::BAD_GATEWAY,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "No se pudo contactar al servicio de autorización".to_string(),
                    detalle: Some(mensaje.clone()),
                    errores: None,
                },
            ),

            ImportacionError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "Timeout consultando el servicio de autorización".to_string(),
                    detalle: None,
                    errores: None,
                },
            ),

            ImportacionError::RespuestaVacia { clave } => (
                StatusCode::BAD_GATEWAY,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "El servicio de autorización no devolvió información".to_string(),
                    detalle: Some(clave.clone()),
                    errores: None,
                },
            ),

            ImportacionError::NoAutorizado { estado, mensajes } => (
                StatusCode::BAD_GATEWAY,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: format!("El comprobante no está autorizado (estado: {})", estado),
                    detalle: Some(mensajes.clone()),
                    errores: None,
                },
            ),

            ImportacionError::ErrorParseo { detalle } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "El comprobante no pudo ser interpretado".to_string(),
                    detalle: Some(detalle.clone()),
                    errores: None,
                },
            ),

            ImportacionError::ErrorPersistencia { mensaje } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "Error interno al guardar el comprobante".to_string(),
                    detalle: Some(mensaje.clone()),
                    errores: None,
                },
            ),

            ImportacionError::ErrorInterno { mensaje } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RespuestaError {
                    estado: self.codigo().to_string(),
                    mensaje: "Error interno del sistema".to_string(),
                    detalle: Some(mensaje.clone()),
                    errores: None,
                },
            ),
        };

        (status, Json(respuesta)).into_response()
    }
}

// ============================================================================
// CONVERSION FROM OTHER ERROR TYPES
// ============================================================================

impl From<sqlx::Error> for ImportacionError {
    fn from(err: sqlx::Error) -> Self {
        ImportacionError::ErrorPersistencia {
            mensaje: format!("Error de base de datos: {}", err),
        }
    }
}

impl From<reqwest::Error> for ImportacionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ImportacionError::Timeout
        } else {
            ImportacionError::ErrorConexion {
                mensaje: format!("{}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_clave_invalida_response() {
        let error = ImportacionError::ClaveInvalida {
            clave: "123".to_string(),
            detalle: "longitud 3 (se esperan 49 dígitos)".to_string(),
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicado_response() {
        let error = ImportacionError::ComprobanteDuplicado {
            clave: "1".repeat(49),
            venta_id: Some(42),
            usuario_original: Some(7),
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_no_autorizado_response() {
        let error = ImportacionError::NoAutorizado {
            estado: "NO AUTORIZADO".to_string(),
            mensajes: "58: Clave de acceso en procesamiento".to_string(),
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_timeout_response() {
        let response = ImportacionError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_codigo_por_variante() {
        assert_eq!(
            ImportacionError::ErrorParseo { detalle: "x".into() }.codigo(),
            "ERROR_PARSEO"
        );
        assert_eq!(ImportacionError::Timeout.codigo(), "TIMEOUT");
    }
}
