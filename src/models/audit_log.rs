// ============================================================================
// AUDIT LOG MODELS
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RegistroAuditoria {
    pub id: i32,
    pub usuario_id: i32,
    pub empresa_id: i32,
    pub modulo: String,
    pub accion: String,
    pub descripcion: String,
    pub creada_en: DateTime<Utc>,
}

// ============================================================================
// EVENT BUILDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct EventoAuditoria {
    pub usuario_id: i32,
    pub empresa_id: i32,
    pub modulo: String,
    pub accion: AccionAuditoria,
    pub descripcion: String,
}

impl EventoAuditoria {
    pub fn nuevo(accion: AccionAuditoria) -> Self {
        Self {
            usuario_id: 0,
            empresa_id: 0,
            modulo: "comprobantes".to_string(),
            accion,
            descripcion: String::new(),
        }
    }

    pub fn usuario(mut self, usuario_id: i32) -> Self {
        self.usuario_id = usuario_id;
        self
    }

    pub fn empresa(mut self, empresa_id: i32) -> Self {
        self.empresa_id = empresa_id;
        self
    }

    pub fn descripcion(mut self, descripcion: impl Into<String>) -> Self {
        self.descripcion = descripcion.into();
        self
    }
}

// ============================================================================
// EVENT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccionAuditoria {
    ImportacionLote,
    ImportacionIndividual,
}

impl std::fmt::Display for AccionAuditoria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccionAuditoria::ImportacionLote => "importacion_lote",
            AccionAuditoria::ImportacionIndividual => "importacion_individual",
        };
        write!(f, "{}", s)
    }
}
