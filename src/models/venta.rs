use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// ESTADOS DEL REGISTRO DE VENTA
// ============================================================================

/// Ciclo de vida de un registro del libro de ventas. La importación siempre
/// crea registros en `Pendiente`; los estados posteriores pertenecen al
/// módulo de gestión del libro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoVenta {
    Pendiente,
    Validada,
    Reportada,
}

impl EstadoVenta {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoVenta::Pendiente => "PENDIENTE",
            EstadoVenta::Validada => "VALIDADA",
            EstadoVenta::Reportada => "REPORTADA",
        }
    }
}

// ============================================================================
// MODELOS DE BASE DE DATOS
// ============================================================================

/// Fila persistida del libro de ventas.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Venta {
    pub id: i32,
    pub empresa_id: i32,
    pub usuario_id: i32,
    pub periodo: String,
    pub tipo_comprobante: String,
    pub tipo_identificacion_cliente: String,
    pub identificacion_cliente: String,
    pub razon_social_cliente: String,
    pub fecha_emision: NaiveDate,
    pub establecimiento: String,
    pub punto_emision: String,
    pub secuencial: String,
    pub clave_acceso: String,
    pub base_cero: Decimal,
    pub base_iva: Decimal,
    pub base_no_objeto: Decimal,
    pub base_exenta: Decimal,
    pub monto_iva: Decimal,
    pub monto_ice: Decimal,
    pub retencion_iva: Decimal,
    pub retencion_renta: Decimal,
    pub importe_total: Decimal,
    pub forma_pago: String,
    pub estado: String,
    pub observaciones: String,
    pub creada_en: DateTime<Utc>,
}

/// Borrador de venta producido por el mapeo de impuestos, todavía sin id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentaNueva {
    pub empresa_id: i32,
    pub usuario_id: i32,
    pub periodo: String,
    pub tipo_comprobante: String,
    pub tipo_identificacion_cliente: String,
    pub identificacion_cliente: String,
    pub razon_social_cliente: String,
    pub fecha_emision: NaiveDate,
    pub establecimiento: String,
    pub punto_emision: String,
    pub secuencial: String,
    pub clave_acceso: String,
    pub base_cero: Decimal,
    pub base_iva: Decimal,
    pub base_no_objeto: Decimal,
    pub base_exenta: Decimal,
    pub monto_iva: Decimal,
    pub monto_ice: Decimal,
    pub retencion_iva: Decimal,
    pub retencion_renta: Decimal,
    pub importe_total: Decimal,
    pub forma_pago: String,
    pub estado: String,
    pub observaciones: String,
}

/// Proyección mínima usada por la detección de duplicados.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VentaResumen {
    pub id: i32,
    pub usuario_id: i32,
    pub creada_en: DateTime<Utc>,
}
