use tracing::{debug, error, info, warn};

use crate::api::comprobantes::autorizacion_service::ClienteAutorizacion;
use crate::api::comprobantes::clave_acceso;
use crate::api::comprobantes::error_handling::ImportacionError;
use crate::api::comprobantes::models::{
    Ambiente, DetalleImportacion, EstadoDetalle, ResultadoImportacion,
};
use crate::api::comprobantes::repository::AlmacenVentas;
use crate::api::comprobantes::tax_mapper;
use crate::api::comprobantes::xml_parser;
use crate::models::audit_log::{AccionAuditoria, EventoAuditoria};

// ============================================================================
// ORQUESTADOR DE IMPORTACIÓN
// ============================================================================

/// Recorre la tubería completa (validación, duplicados, autorización,
/// parseo, mapeo, persistencia) sobre una o varias claves de acceso.
pub struct ImportService<C, A> {
    cliente: C,
    almacen: A,
}

impl<C, A> ImportService<C, A>
where
    C: ClienteAutorizacion,
    A: AlmacenVentas,
{
    pub fn new(cliente: C, almacen: A) -> Self {
        Self { cliente, almacen }
    }

    /// Importa un lote de claves en orden estricto de entrada. El fallo de
    /// un ítem se registra en su detalle y el lote continúa; todos los
    /// éxitos comparten una sola transacción que se confirma al final.
    pub async fn importar_lote(
        &self,
        claves: &[String],
        empresa_id: i32,
        usuario_id: i32,
        ambiente: Ambiente,
    ) -> Result<ResultadoImportacion, ImportacionError> {
        info!(
            "Iniciando importación de lote: {} claves, empresa {}, ambiente {}",
            claves.len(),
            empresa_id,
            ambiente.as_str()
        );

        let mut tx = self.almacen.iniciar_transaccion().await?;

        let mut detalles = Vec::with_capacity(claves.len());
        let mut exitosos = 0usize;
        let mut fallidos = 0usize;
        let mut duplicados = 0usize;

        for clave in claves {
            match self
                .procesar_clave(&mut tx, clave, empresa_id, usuario_id, ambiente)
                .await
            {
                Ok(venta_id) => {
                    exitosos += 1;
                    detalles.push(DetalleImportacion {
                        clave_acceso: clave.clone(),
                        estado: EstadoDetalle::Exitoso,
                        mensaje: "Comprobante importado correctamente".to_string(),
                        venta_id: Some(venta_id),
                    });
                }
                Err(ImportacionError::ComprobanteDuplicado { venta_id, .. }) => {
                    duplicados += 1;
                    warn!("Comprobante duplicado en el lote: {}", clave);
                    detalles.push(DetalleImportacion {
                        clave_acceso: clave.clone(),
                        estado: EstadoDetalle::Duplicado,
                        mensaje: "El comprobante ya fue importado para esta empresa"
                            .to_string(),
                        venta_id,
                    });
                }
                Err(e) => {
                    fallidos += 1;
                    error!("Fallo importando la clave {}: {}", clave, e);
                    detalles.push(DetalleImportacion {
                        clave_acceso: clave.clone(),
                        estado: EstadoDetalle::Error,
                        mensaje: e.to_string(),
                        venta_id: None,
                    });
                }
            }
        }

        self.almacen.confirmar(tx).await?;

        let evento = EventoAuditoria::nuevo(AccionAuditoria::ImportacionLote)
            .usuario(usuario_id)
            .empresa(empresa_id)
            .descripcion(format!(
                "Importación de lote: {} total, {} exitosos, {} fallidos, {} duplicados",
                claves.len(),
                exitosos,
                fallidos,
                duplicados
            ));
        if let Err(e) = self.almacen.registrar_auditoria(&evento).await {
            // La auditoría no debe tumbar un lote ya confirmado
            warn!("No se pudo registrar la auditoría del lote: {}", e);
        }

        info!(
            "Lote terminado: {} exitosos, {} fallidos, {} duplicados",
            exitosos, fallidos, duplicados
        );

        Ok(ResultadoImportacion {
            total: claves.len(),
            exitosos,
            fallidos,
            duplicados,
            detalles,
        })
    }

    /// La misma tubería para una sola clave, con su propia transacción.
    /// Cualquier fallo sube al llamador en lugar de capturarse en un detalle.
    pub async fn importar_una(
        &self,
        clave: &str,
        empresa_id: i32,
        usuario_id: i32,
        ambiente: Ambiente,
    ) -> Result<i32, ImportacionError> {
        info!(
            "Importando comprobante individual {} para la empresa {}",
            clave, empresa_id
        );

        let mut tx = self.almacen.iniciar_transaccion().await?;
        let venta_id = self
            .procesar_clave(&mut tx, clave, empresa_id, usuario_id, ambiente)
            .await?;
        self.almacen.confirmar(tx).await?;

        let evento = EventoAuditoria::nuevo(AccionAuditoria::ImportacionIndividual)
            .usuario(usuario_id)
            .empresa(empresa_id)
            .descripcion(format!("Importación del comprobante con clave {}", clave));
        if let Err(e) = self.almacen.registrar_auditoria(&evento).await {
            warn!("No se pudo registrar la auditoría: {}", e);
        }

        Ok(venta_id)
    }

    /// Un comprobante dentro de la transacción dada. La verificación de
    /// duplicados va antes de la consulta remota para no gastar la llamada
    /// de red en claves ya registradas.
    async fn procesar_clave(
        &self,
        tx: &mut A::Tx,
        clave: &str,
        empresa_id: i32,
        usuario_id: i32,
        ambiente: Ambiente,
    ) -> Result<i32, ImportacionError> {
        debug!("Validando la clave {}", clave);
        clave_acceso::decodificar(clave)?;

        debug!("Verificando duplicados para {}", clave);
        if let Some(existente) = self
            .almacen
            .buscar_por_clave(tx, empresa_id, clave)
            .await?
        {
            return Err(ImportacionError::ComprobanteDuplicado {
                clave: clave.to_string(),
                venta_id: Some(existente.id),
                usuario_original: Some(existente.usuario_id),
            });
        }

        debug!("Consultando autorización para {}", clave);
        let autorizado = self.cliente.consultar(clave, ambiente).await?;

        debug!("Interpretando el comprobante {}", clave);
        let normalizado = xml_parser::parsear(&autorizado.comprobante)?;

        let venta = tax_mapper::mapear_a_venta(&normalizado, empresa_id, usuario_id)?;

        debug!("Persistiendo la venta para {}", clave);
        self.almacen.crear(tx, &venta).await
    }
}
