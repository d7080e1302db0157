use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Acquire, PgConnection, PgPool, Postgres, Row, Transaction};
use tracing::{error, info};

use crate::api::comprobantes::error_handling::ImportacionError;
use crate::models::audit_log::EventoAuditoria;
use crate::models::venta::{VentaNueva, VentaResumen};

// ============================================================================
// ALMACÉN DE VENTAS
// ============================================================================

/// Colaborador de persistencia del libro de ventas. El orquestador de
/// importación trabaja contra esta interfaz para que las pruebas puedan
/// sustituir la base de datos por un almacén en memoria.
#[async_trait]
pub trait AlmacenVentas: Send + Sync {
    type Tx: Send;

    async fn iniciar_transaccion(&self) -> Result<Self::Tx, ImportacionError>;

    async fn confirmar(&self, tx: Self::Tx) -> Result<(), ImportacionError>;

    /// Búsqueda por (empresa, clave de acceso), la llave natural de
    /// deduplicación. Se ejecuta dentro de la transacción del lote para que
    /// una clave repetida dentro del mismo lote también se detecte.
    async fn buscar_por_clave(
        &self,
        tx: &mut Self::Tx,
        empresa_id: i32,
        clave: &str,
    ) -> Result<Option<VentaResumen>, ImportacionError>;

    async fn crear(
        &self,
        tx: &mut Self::Tx,
        venta: &VentaNueva,
    ) -> Result<i32, ImportacionError>;

    async fn registrar_auditoria(
        &self,
        evento: &EventoAuditoria,
    ) -> Result<(), ImportacionError>;
}

// ============================================================================
// IMPLEMENTACIÓN POSTGRES
// ============================================================================

pub struct AlmacenVentasPg {
    pool: PgPool,
}

impl AlmacenVentasPg {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlmacenVentas for AlmacenVentasPg {
    type Tx = Transaction<'static, Postgres>;

    async fn iniciar_transaccion(&self) -> Result<Self::Tx, ImportacionError> {
        Ok(self.pool.begin().await?)
    }

    async fn confirmar(&self, tx: Self::Tx) -> Result<(), ImportacionError> {
        tx.commit().await.map_err(|e| {
            error!("Error confirmando la transacción del lote: {}", e);
            ImportacionError::ErrorPersistencia {
                mensaje: format!("No se pudo confirmar la transacción: {}", e),
            }
        })
    }

    async fn buscar_por_clave(
        &self,
        tx: &mut Self::Tx,
        empresa_id: i32,
        clave: &str,
    ) -> Result<Option<VentaResumen>, ImportacionError> {
        obtener_venta_por_clave(&mut **tx, empresa_id, clave).await
    }

    async fn crear(
        &self,
        tx: &mut Self::Tx,
        venta: &VentaNueva,
    ) -> Result<i32, ImportacionError> {
        // SAVEPOINT: un fallo del INSERT no invalida la transacción del lote
        let mut sp = (&mut *tx).begin().await?;
        match insertar_venta(&mut sp, venta).await {
            Ok(id) => {
                sp.commit().await?;
                Ok(id)
            }
            Err(e) => {
                let _ = sp.rollback().await;
                Err(e)
            }
        }
    }

    async fn registrar_auditoria(
        &self,
        evento: &EventoAuditoria,
    ) -> Result<(), ImportacionError> {
        let query = r#"
            INSERT INTO auditoria (usuario_id, empresa_id, modulo, accion, descripcion, creada_en)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        sqlx::query(query)
            .bind(evento.usuario_id)
            .bind(evento.empresa_id)
            .bind(&evento.modulo)
            .bind(evento.accion.to_string())
            .bind(&evento.descripcion)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// CONSULTAS
// ============================================================================

pub async fn obtener_venta_por_clave(
    conn: &mut PgConnection,
    empresa_id: i32,
    clave: &str,
) -> Result<Option<VentaResumen>, ImportacionError> {
    let query = r#"
        SELECT id, usuario_id, creada_en
        FROM ventas
        WHERE empresa_id = $1 AND clave_acceso = $2
    "#;

    match sqlx::query(query)
        .bind(empresa_id)
        .bind(clave)
        .fetch_optional(conn)
        .await
    {
        Ok(Some(row)) => Ok(Some(VentaResumen {
            id: row.try_get("id")?,
            usuario_id: row.try_get("usuario_id")?,
            creada_en: row.try_get("creada_en")?,
        })),
        Ok(None) => Ok(None),
        Err(e) => {
            error!("Error buscando duplicados para la clave {}: {}", clave, e);
            Err(ImportacionError::ErrorPersistencia {
                mensaje: format!("Error verificando duplicados: {}", e),
            })
        }
    }
}

pub async fn insertar_venta(
    conn: &mut PgConnection,
    venta: &VentaNueva,
) -> Result<i32, ImportacionError> {
    let query = r#"
        INSERT INTO ventas (
            empresa_id, usuario_id, periodo, tipo_comprobante,
            tipo_identificacion_cliente, identificacion_cliente, razon_social_cliente,
            fecha_emision, establecimiento, punto_emision, secuencial, clave_acceso,
            base_cero, base_iva, base_no_objeto, base_exenta,
            monto_iva, monto_ice, retencion_iva, retencion_renta,
            importe_total, forma_pago, estado, observaciones, creada_en
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
            $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
        )
        RETURNING id
    "#;

    let id = sqlx::query(query)
        .bind(venta.empresa_id)
        .bind(venta.usuario_id)
        .bind(&venta.periodo)
        .bind(&venta.tipo_comprobante)
        .bind(&venta.tipo_identificacion_cliente)
        .bind(&venta.identificacion_cliente)
        .bind(&venta.razon_social_cliente)
        .bind(venta.fecha_emision)
        .bind(&venta.establecimiento)
        .bind(&venta.punto_emision)
        .bind(&venta.secuencial)
        .bind(&venta.clave_acceso)
        .bind(venta.base_cero)
        .bind(venta.base_iva)
        .bind(venta.base_no_objeto)
        .bind(venta.base_exenta)
        .bind(venta.monto_iva)
        .bind(venta.monto_ice)
        .bind(venta.retencion_iva)
        .bind(venta.retencion_renta)
        .bind(venta.importe_total)
        .bind(&venta.forma_pago)
        .bind(&venta.estado)
        .bind(&venta.observaciones)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            error!(
                "Error insertando la venta con clave {}: {}",
                venta.clave_acceso, e
            );
            ImportacionError::ErrorPersistencia {
                mensaje: format!("No se pudo guardar la venta: {}", e),
            }
        })?
        .try_get::<i32, _>("id")?;

    info!(
        "Venta {} creada para la clave {}",
        id, venta.clave_acceso
    );
    Ok(id)
}
