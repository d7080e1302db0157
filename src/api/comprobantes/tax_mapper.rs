use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::api::comprobantes::error_handling::ImportacionError;
use crate::api::comprobantes::models::ComprobanteNormalizado;
use crate::models::venta::{EstadoVenta, VentaNueva};

// ============================================================================
// CÓDIGOS DE IMPUESTO
// ============================================================================

const CODIGO_IVA: &str = "2";
const CODIGO_ICE: &str = "3";

/// Forma de pago por defecto: sin utilización del sistema financiero.
const FORMA_PAGO_DEFECTO: &str = "01";

// ============================================================================
// MAPEO A REGISTRO DE VENTA
// ============================================================================

/// Convierte un comprobante normalizado en un borrador del libro de ventas,
/// clasificando cada línea de impuesto en su balde de base imponible.
///
/// Los campos de retención se inicializan en cero; el enlace con los
/// comprobantes de retención lo hace el módulo de gestión del libro.
pub fn mapear_a_venta(
    comprobante: &ComprobanteNormalizado,
    empresa_id: i32,
    usuario_id: i32,
) -> Result<VentaNueva, ImportacionError> {
    let fecha_emision = NaiveDate::parse_from_str(&comprobante.fecha_emision, "%d/%m/%Y")
        .map_err(|_| ImportacionError::ErrorParseo {
            detalle: format!(
                "fechaEmision ausente o inválida: '{}'",
                comprobante.fecha_emision
            ),
        })?;

    let periodo = format!("{:02}/{}", fecha_emision.month(), fecha_emision.year());

    let mut base_cero = Decimal::ZERO;
    let mut base_iva = Decimal::ZERO;
    let mut base_no_objeto = Decimal::ZERO;
    let mut monto_iva = Decimal::ZERO;
    let mut monto_ice = Decimal::ZERO;

    for linea in &comprobante.impuestos {
        match linea.codigo.as_str() {
            CODIGO_IVA => match linea.codigo_porcentaje.as_str() {
                // Tarifa 0%
                "0" => base_cero += linea.base_imponible,
                // No objeto de impuesto y exento
                "6" | "7" => base_no_objeto += linea.base_imponible,
                // Tarifas vigentes e históricas (12, 14, 15 y 5 por ciento)
                "2" | "3" | "4" | "8" => {
                    base_iva += linea.base_imponible;
                    monto_iva += linea.valor;
                }
                otro => {
                    debug!(
                        "Código de porcentaje IVA no clasificado: {} (clave {})",
                        otro, comprobante.clave_acceso
                    );
                }
            },
            CODIGO_ICE => monto_ice += linea.valor,
            otro => {
                debug!(
                    "Código de impuesto no clasificado: {} (clave {})",
                    otro, comprobante.clave_acceso
                );
            }
        }
    }

    let forma_pago = comprobante
        .pagos
        .first()
        .map(|p| p.forma_pago.clone())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| FORMA_PAGO_DEFECTO.to_string());

    let observaciones = format!(
        "Importado del SRI ({}) con clave de acceso {}",
        comprobante.tipo.as_str(),
        comprobante.clave_acceso
    );

    Ok(VentaNueva {
        empresa_id,
        usuario_id,
        periodo,
        tipo_comprobante: comprobante.tipo.as_str().to_string(),
        tipo_identificacion_cliente: comprobante.tipo_identificacion_comprador.clone(),
        identificacion_cliente: comprobante.identificacion_comprador.clone(),
        razon_social_cliente: comprobante.razon_social_comprador.clone(),
        fecha_emision,
        establecimiento: comprobante.establecimiento.clone(),
        punto_emision: comprobante.punto_emision.clone(),
        secuencial: comprobante.secuencial.clone(),
        clave_acceso: comprobante.clave_acceso.clone(),
        base_cero,
        base_iva,
        base_no_objeto,
        base_exenta: Decimal::ZERO,
        monto_iva,
        monto_ice,
        retencion_iva: Decimal::ZERO,
        retencion_renta: Decimal::ZERO,
        importe_total: comprobante.importe_total,
        forma_pago,
        estado: EstadoVenta::Pendiente.as_str().to_string(),
        observaciones,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::comprobantes::models::{LineaImpuesto, LineaPago, TipoComprobante};

    fn comprobante_base() -> ComprobanteNormalizado {
        ComprobanteNormalizado {
            tipo: TipoComprobante::Factura,
            ruc_emisor: "0992837635001".to_string(),
            razon_social_emisor: "COMERCIAL ANDINA S.A.".to_string(),
            nombre_comercial_emisor: "ANDINA".to_string(),
            dir_matriz_emisor: "Av. Amazonas N24-03".to_string(),
            clave_acceso: "2306202501099283763500120010010000001231234567814".to_string(),
            establecimiento: "001".to_string(),
            punto_emision: "002".to_string(),
            secuencial: "000000123".to_string(),
            fecha_emision: "23/06/2025".to_string(),
            tipo_identificacion_comprador: "04".to_string(),
            identificacion_comprador: "1790012345001".to_string(),
            razon_social_comprador: "DISTRIBUIDORA DEL SUR CIA LTDA".to_string(),
            direccion_comprador: "Av. Quitumbe".to_string(),
            total_sin_impuestos: Decimal::new(15000, 2),
            total_descuento: Decimal::ZERO,
            propina: Decimal::ZERO,
            importe_total: Decimal::new(16500, 2),
            moneda: "DOLAR".to_string(),
            impuestos: Vec::new(),
            pagos: Vec::new(),
        }
    }

    fn linea(codigo: &str, porcentaje: &str, base: Decimal, valor: Decimal) -> LineaImpuesto {
        LineaImpuesto {
            codigo: codigo.to_string(),
            codigo_porcentaje: porcentaje.to_string(),
            base_imponible: base,
            tarifa: Decimal::ZERO,
            valor,
        }
    }

    #[test]
    fn test_baldes_iva_suman_las_lineas_gravadas() {
        let mut comprobante = comprobante_base();
        comprobante.impuestos = vec![
            linea("2", "2", Decimal::new(10000, 2), Decimal::new(1200, 2)),
            linea("2", "3", Decimal::new(5000, 2), Decimal::new(700, 2)),
            linea("2", "4", Decimal::new(2000, 2), Decimal::new(300, 2)),
            linea("2", "8", Decimal::new(1000, 2), Decimal::new(50, 2)),
        ];

        let venta = mapear_a_venta(&comprobante, 1, 1).unwrap();
        assert_eq!(venta.base_iva, Decimal::new(18000, 2));
        assert_eq!(venta.monto_iva, Decimal::new(2250, 2));
        assert_eq!(venta.base_cero, Decimal::ZERO);
        assert_eq!(venta.base_no_objeto, Decimal::ZERO);
    }

    #[test]
    fn test_tarifa_cero_y_no_objeto() {
        let mut comprobante = comprobante_base();
        comprobante.impuestos = vec![
            linea("2", "0", Decimal::new(4000, 2), Decimal::ZERO),
            linea("2", "6", Decimal::new(1500, 2), Decimal::ZERO),
            linea("2", "7", Decimal::new(500, 2), Decimal::ZERO),
        ];

        let venta = mapear_a_venta(&comprobante, 1, 1).unwrap();
        assert_eq!(venta.base_cero, Decimal::new(4000, 2));
        assert_eq!(venta.base_no_objeto, Decimal::new(2000, 2));
        assert_eq!(venta.base_iva, Decimal::ZERO);
        assert_eq!(venta.monto_iva, Decimal::ZERO);
    }

    #[test]
    fn test_ice_acumula_sin_tocar_bases() {
        let mut comprobante = comprobante_base();
        comprobante.impuestos = vec![
            linea("3", "3051", Decimal::new(8000, 2), Decimal::new(2400, 2)),
            linea("2", "4", Decimal::new(8000, 2), Decimal::new(1200, 2)),
        ];

        let venta = mapear_a_venta(&comprobante, 1, 1).unwrap();
        assert_eq!(venta.monto_ice, Decimal::new(2400, 2));
        assert_eq!(venta.base_iva, Decimal::new(8000, 2));
    }

    #[test]
    fn test_codigos_desconocidos_se_ignoran() {
        let mut comprobante = comprobante_base();
        comprobante.impuestos = vec![
            linea("5", "1", Decimal::new(9900, 2), Decimal::new(500, 2)),
            linea("2", "99", Decimal::new(700, 2), Decimal::new(100, 2)),
        ];

        let venta = mapear_a_venta(&comprobante, 1, 1).unwrap();
        assert_eq!(venta.base_cero, Decimal::ZERO);
        assert_eq!(venta.base_iva, Decimal::ZERO);
        assert_eq!(venta.base_no_objeto, Decimal::ZERO);
        assert_eq!(venta.monto_iva, Decimal::ZERO);
        assert_eq!(venta.monto_ice, Decimal::ZERO);
    }

    #[test]
    fn test_periodo_y_fecha_iso() {
        let venta = mapear_a_venta(&comprobante_base(), 1, 1).unwrap();
        assert_eq!(venta.periodo, "06/2025");
        assert_eq!(
            venta.fecha_emision,
            NaiveDate::from_ymd_opt(2025, 6, 23).unwrap()
        );
    }

    #[test]
    fn test_forma_pago_por_defecto() {
        let venta = mapear_a_venta(&comprobante_base(), 1, 1).unwrap();
        assert_eq!(venta.forma_pago, "01");

        let mut con_pago = comprobante_base();
        con_pago.pagos = vec![LineaPago {
            forma_pago: "20".to_string(),
            total: Decimal::new(16500, 2),
            plazo: None,
            unidad_tiempo: None,
        }];
        let venta = mapear_a_venta(&con_pago, 1, 1).unwrap();
        assert_eq!(venta.forma_pago, "20");
    }

    #[test]
    fn test_retenciones_inician_en_cero_y_estado_pendiente() {
        let venta = mapear_a_venta(&comprobante_base(), 1, 1).unwrap();
        assert_eq!(venta.retencion_iva, Decimal::ZERO);
        assert_eq!(venta.retencion_renta, Decimal::ZERO);
        assert_eq!(venta.estado, "PENDIENTE");
        assert!(venta.observaciones.contains("factura"));
    }

    #[test]
    fn test_fecha_ausente_es_error_de_parseo() {
        let mut sin_fecha = comprobante_base();
        sin_fecha.fecha_emision = String::new();

        let err = mapear_a_venta(&sin_fecha, 1, 1).unwrap_err();
        assert!(matches!(err, ImportacionError::ErrorParseo { .. }));
    }
}
