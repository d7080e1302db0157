use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use crate::api::comprobantes::error_handling::ImportacionError;

// ============================================================================
// REQUEST/RESPONSE MODELS
// ============================================================================

/// Cuerpo de POST /api/comprobantes/importar.
/// `claves` es una lista separada por saltos de línea (una clave por línea,
/// las líneas en blanco se ignoran).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportarLoteRequest {
    pub claves: String,
    pub empresa_id: i32,
    pub usuario_id: i32,
    pub ambiente: Option<String>,
}

/// Cuerpo de POST /api/comprobantes/importar-una.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportarUnaRequest {
    pub clave: String,
    pub empresa_id: i32,
    pub usuario_id: i32,
    pub ambiente: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportarUnaResponse {
    pub estado: String,
    pub mensaje: String,
    #[serde(rename = "claveAcceso")]
    pub clave_acceso: String,
    #[serde(rename = "ventaId")]
    pub venta_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespuestaError {
    pub estado: String,
    pub mensaje: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detalle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errores: Option<Vec<String>>,
}

// ============================================================================
// AMBIENTE
// ============================================================================

/// Ambiente del servicio de autorización del SRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ambiente {
    #[default]
    Produccion,
    Pruebas,
}

impl Ambiente {
    /// Interpreta el token recibido en el request. Sin token se asume
    /// producción.
    pub fn desde_token(token: Option<&str>) -> Result<Self, ImportacionError> {
        match token.map(str::trim) {
            None | Some("") => Ok(Ambiente::Produccion),
            Some("PRODUCCION") => Ok(Ambiente::Produccion),
            Some("PRUEBAS") => Ok(Ambiente::Pruebas),
            Some(otro) => Err(ImportacionError::ValidacionError {
                errores: vec![format!(
                    "Ambiente debe ser PRODUCCION o PRUEBAS. Recibido: {}",
                    otro
                )],
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ambiente::Produccion => "PRODUCCION",
            Ambiente::Pruebas => "PRUEBAS",
        }
    }
}

// ============================================================================
// CLAVE DE ACCESO
// ============================================================================

/// Campos estructurales de la clave de acceso de 49 dígitos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaveAccesoCampos {
    /// Fecha de emisión tal como viene en la clave (ddmmyyyy).
    pub fecha_emision: String,
    /// Fecha de emisión en formato dd/mm/yyyy.
    pub fecha_formateada: String,
    pub tipo_comprobante: String,
    pub ruc: String,
    pub tipo_ambiente: String,
    pub establecimiento: String,
    pub punto_emision: String,
    pub secuencial: String,
    pub codigo_numerico: String,
    pub digito_verificador: String,
}

// ============================================================================
// RESPUESTA DEL SERVICIO DE AUTORIZACIÓN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MensajeAutorizacion {
    pub identificador: String,
    pub mensaje: String,
}

/// Autorización normalizada del servicio del SRI, con el XML del
/// comprobante ya decodificado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprobanteAutorizado {
    pub estado: String,
    pub numero_autorizacion: Option<String>,
    pub fecha_autorizacion: Option<String>,
    pub comprobante: String,
    pub mensajes: Vec<MensajeAutorizacion>,
}

// ============================================================================
// COMPROBANTE NORMALIZADO
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoComprobante {
    Factura,
    NotaCredito,
    NotaDebito,
    ComprobanteRetencion,
    GuiaRemision,
}

impl TipoComprobante {
    /// Resuelve el tipo a partir del nombre del elemento raíz del XML.
    pub fn desde_raiz(nombre: &str) -> Option<Self> {
        match nombre {
            "factura" => Some(TipoComprobante::Factura),
            "notaCredito" => Some(TipoComprobante::NotaCredito),
            "notaDebito" => Some(TipoComprobante::NotaDebito),
            "comprobanteRetencion" => Some(TipoComprobante::ComprobanteRetencion),
            "guiaRemision" => Some(TipoComprobante::GuiaRemision),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TipoComprobante::Factura => "factura",
            TipoComprobante::NotaCredito => "notaCredito",
            TipoComprobante::NotaDebito => "notaDebito",
            TipoComprobante::ComprobanteRetencion => "comprobanteRetencion",
            TipoComprobante::GuiaRemision => "guiaRemision",
        }
    }
}

/// Línea de impuesto de `totalConImpuestos/totalImpuesto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineaImpuesto {
    pub codigo: String,
    pub codigo_porcentaje: String,
    pub base_imponible: Decimal,
    pub tarifa: Decimal,
    pub valor: Decimal,
}

/// Línea de pago de `pagos/pago`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineaPago {
    pub forma_pago: String,
    pub total: Decimal,
    pub plazo: Option<Decimal>,
    pub unidad_tiempo: Option<String>,
}

/// Campos planos extraídos del XML de un comprobante electrónico,
/// independientes del tipo de documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprobanteNormalizado {
    pub tipo: TipoComprobante,

    // infoTributaria
    pub ruc_emisor: String,
    pub razon_social_emisor: String,
    pub nombre_comercial_emisor: String,
    pub dir_matriz_emisor: String,
    pub clave_acceso: String,
    pub establecimiento: String,
    pub punto_emision: String,
    pub secuencial: String,

    // Bloque de información del documento (infoFactura / infoNotaCredito /
    // infoNotaDebito). Puede venir vacío en retenciones y guías.
    pub fecha_emision: String,
    pub tipo_identificacion_comprador: String,
    pub identificacion_comprador: String,
    pub razon_social_comprador: String,
    pub direccion_comprador: String,
    pub total_sin_impuestos: Decimal,
    pub total_descuento: Decimal,
    pub propina: Decimal,
    pub importe_total: Decimal,
    pub moneda: String,

    pub impuestos: Vec<LineaImpuesto>,
    pub pagos: Vec<LineaPago>,
}

// ============================================================================
// RESULTADO DE IMPORTACIÓN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoDetalle {
    #[serde(rename = "EXITOSO")]
    Exitoso,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "DUPLICADO")]
    Duplicado,
}

impl EstadoDetalle {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoDetalle::Exitoso => "EXITOSO",
            EstadoDetalle::Error => "ERROR",
            EstadoDetalle::Duplicado => "DUPLICADO",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetalleImportacion {
    #[serde(rename = "claveAcceso")]
    pub clave_acceso: String,
    pub estado: EstadoDetalle,
    pub mensaje: String,
    #[serde(rename = "ventaId", skip_serializing_if = "Option::is_none")]
    pub venta_id: Option<i32>,
}

/// Resultado agregado de un lote de importación. Los detalles conservan el
/// orden de las claves de entrada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultadoImportacion {
    pub total: usize,
    pub exitosos: usize,
    pub fallidos: usize,
    pub duplicados: usize,
    pub detalles: Vec<DetalleImportacion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiente_desde_token() {
        assert_eq!(Ambiente::desde_token(None).unwrap(), Ambiente::Produccion);
        assert_eq!(Ambiente::desde_token(Some("")).unwrap(), Ambiente::Produccion);
        assert_eq!(
            Ambiente::desde_token(Some("PRODUCCION")).unwrap(),
            Ambiente::Produccion
        );
        assert_eq!(
            Ambiente::desde_token(Some("PRUEBAS")).unwrap(),
            Ambiente::Pruebas
        );
        assert!(Ambiente::desde_token(Some("STAGING")).is_err());
    }

    #[test]
    fn test_tipo_comprobante_desde_raiz() {
        assert_eq!(
            TipoComprobante::desde_raiz("factura"),
            Some(TipoComprobante::Factura)
        );
        assert_eq!(
            TipoComprobante::desde_raiz("comprobanteRetencion"),
            Some(TipoComprobante::ComprobanteRetencion)
        );
        assert_eq!(TipoComprobante::desde_raiz("liquidacionCompra"), None);
    }

    #[test]
    fn test_detalle_serializa_nombres_de_contrato() {
        let detalle = DetalleImportacion {
            clave_acceso: "1".repeat(49),
            estado: EstadoDetalle::Exitoso,
            mensaje: "ok".to_string(),
            venta_id: Some(10),
        };

        let json = serde_json::to_value(&detalle).unwrap();
        assert!(json.get("claveAcceso").is_some());
        assert_eq!(json["estado"], "EXITOSO");
        assert_eq!(json["ventaId"], 10);
    }

    #[test]
    fn test_detalle_omite_venta_id_ausente() {
        let detalle = DetalleImportacion {
            clave_acceso: "1".repeat(49),
            estado: EstadoDetalle::Error,
            mensaje: "falló".to_string(),
            venta_id: None,
        };

        let json = serde_json::to_value(&detalle).unwrap();
        assert!(json.get("ventaId").is_none());
    }
}
