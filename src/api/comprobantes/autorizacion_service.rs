use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sxd_document::dom::{Document, Element};
use sxd_document::parser;
use tracing::{debug, info, warn};

use crate::api::comprobantes::error_handling::ImportacionError;
use crate::api::comprobantes::models::{Ambiente, ComprobanteAutorizado, MensajeAutorizacion};
use crate::api::comprobantes::xml_parser::{
    elementos_xpath, hijo, hijos_elementos, quitar_prefijos, texto_elemento, texto_hijo,
};

// ============================================================================
// CONFIGURACIÓN
// ============================================================================

const URL_PRODUCCION: &str =
    "https://cel.sri.gob.ec/comprobantes-electronicos-ws/AutorizacionComprobantesOffline";
const URL_PRUEBAS: &str =
    "https://celcer.sri.gob.ec/comprobantes-electronicos-ws/AutorizacionComprobantesOffline";

/// Tabla de endpoints del servicio de autorización, inyectada en el cliente
/// para que las pruebas puedan apuntar a un servidor local.
#[derive(Debug, Clone)]
pub struct SriConfig {
    pub url_produccion: String,
    pub url_pruebas: String,
    pub timeout_segundos: u64,
}

impl SriConfig {
    pub fn from_env() -> Self {
        SriConfig {
            url_produccion: env::var("SRI_AUTORIZACION_URL_PRODUCCION")
                .unwrap_or_else(|_| URL_PRODUCCION.to_string()),
            url_pruebas: env::var("SRI_AUTORIZACION_URL_PRUEBAS")
                .unwrap_or_else(|_| URL_PRUEBAS.to_string()),
            timeout_segundos: env::var("SRI_TIMEOUT_SEGUNDOS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn endpoint(&self, ambiente: Ambiente) -> &str {
        match ambiente {
            Ambiente::Produccion => &self.url_produccion,
            Ambiente::Pruebas => &self.url_pruebas,
        }
    }
}

impl Default for SriConfig {
    fn default() -> Self {
        SriConfig {
            url_produccion: URL_PRODUCCION.to_string(),
            url_pruebas: URL_PRUEBAS.to_string(),
            timeout_segundos: 30,
        }
    }
}

// ============================================================================
// CLIENTE DE AUTORIZACIÓN
// ============================================================================

/// Consulta remota de la autorización de un comprobante por clave de acceso.
#[async_trait]
pub trait ClienteAutorizacion: Send + Sync {
    async fn consultar(
        &self,
        clave: &str,
        ambiente: Ambiente,
    ) -> Result<ComprobanteAutorizado, ImportacionError>;
}

pub struct AutorizacionService {
    client: Client,
    config: SriConfig,
}

impl AutorizacionService {
    pub fn new(config: SriConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_segundos))
            .build()
            .expect("No se pudo construir el cliente HTTP");

        Self { client, config }
    }
}

fn cuerpo_soap(clave: &str) -> String {
    format!(
        concat!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:ec="http://ec.gob.sri.ws.autorizacion">"#,
            "<soapenv:Header/><soapenv:Body>",
            "<ec:autorizacionComprobante>",
            "<claveAccesoComprobante>{}</claveAccesoComprobante>",
            "</ec:autorizacionComprobante>",
            "</soapenv:Body></soapenv:Envelope>"
        ),
        clave
    )
}

#[async_trait]
impl ClienteAutorizacion for AutorizacionService {
    async fn consultar(
        &self,
        clave: &str,
        ambiente: Ambiente,
    ) -> Result<ComprobanteAutorizado, ImportacionError> {
        let url = self.config.endpoint(ambiente);
        debug!("Consultando autorización de {} en {}", clave, url);

        let respuesta = self
            .client
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .body(cuerpo_soap(clave))
            .send()
            .await?;

        if !respuesta.status().is_success() {
            return Err(ImportacionError::ErrorConexion {
                mensaje: format!("el servicio respondió HTTP {}", respuesta.status()),
            });
        }

        let cuerpo = respuesta.text().await?;
        if cuerpo.trim().is_empty() {
            return Err(ImportacionError::RespuestaVacia {
                clave: clave.to_string(),
            });
        }

        let autorizado = interpretar_respuesta(&cuerpo, clave)?;
        info!(
            "Comprobante {} autorizado ({})",
            clave,
            autorizado
                .fecha_autorizacion
                .as_deref()
                .unwrap_or("sin fecha")
        );
        Ok(autorizado)
    }
}

// ============================================================================
// INTERPRETACIÓN DE LA RESPUESTA
// ============================================================================

/// Decodifica las entidades HTML del comprobante embebido. Sobre un texto ya
/// decodificado no tiene efecto.
pub fn decodificar_entidades(texto: &str) -> String {
    texto
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// El servicio entrega la colección de autorizaciones con variaciones de
/// nombre y de cardinalidad; aquí se reduce siempre a una lista canónica.
fn normalizar_autorizaciones<'d>(documento: &'d Document<'d>) -> Vec<Element<'d>> {
    const VARIANTES: [&str; 4] = [
        "//autorizaciones/autorizacion",
        "//Autorizaciones/Autorizacion",
        "//autorizacion",
        "//Autorizacion",
    ];

    for expr in VARIANTES {
        let nodos = elementos_xpath(documento, expr);
        if !nodos.is_empty() {
            return nodos;
        }
    }
    Vec::new()
}

fn extraer_mensajes(autorizacion: Element<'_>) -> Vec<MensajeAutorizacion> {
    let mut mensajes = Vec::new();

    if let Some(contenedor) = hijo(autorizacion, "mensajes") {
        for elemento in hijos_elementos(contenedor) {
            if elemento.name().local_part() == "mensaje" {
                mensajes.push(MensajeAutorizacion {
                    identificador: texto_hijo(elemento, "identificador").unwrap_or_default(),
                    mensaje: texto_hijo(elemento, "mensaje").unwrap_or_default(),
                });
            }
        }
    }

    // Forma singular: un <mensaje> colgado directamente de la autorización
    if mensajes.is_empty() {
        if let Some(elemento) = hijo(autorizacion, "mensaje") {
            mensajes.push(MensajeAutorizacion {
                identificador: texto_hijo(elemento, "identificador").unwrap_or_default(),
                mensaje: texto_hijo(elemento, "mensaje")
                    .unwrap_or_else(|| texto_elemento(elemento)),
            });
        }
    }

    mensajes
}

fn concatenar_mensajes(mensajes: &[MensajeAutorizacion]) -> String {
    if mensajes.is_empty() {
        return "sin mensajes del servicio".to_string();
    }
    mensajes
        .iter()
        .map(|m| format!("{}: {}", m.identificador, m.mensaje))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Interpreta el XML de respuesta del servicio de autorización. Función pura
/// para poder probarla sin red.
pub fn interpretar_respuesta(
    cuerpo: &str,
    clave: &str,
) -> Result<ComprobanteAutorizado, ImportacionError> {
    let limpio = quitar_prefijos(cuerpo);
    let paquete = parser::parse(&limpio).map_err(|e| ImportacionError::ErrorConexion {
        mensaje: format!("respuesta no interpretable del servicio: {}", e),
    })?;
    let documento = paquete.as_document();

    let autorizaciones = normalizar_autorizaciones(&documento);
    let autorizacion = match autorizaciones.first() {
        Some(a) => *a,
        None => {
            warn!("Respuesta sin autorizaciones para la clave {}", clave);
            return Err(ImportacionError::RespuestaVacia {
                clave: clave.to_string(),
            });
        }
    };

    let estado = texto_hijo(autorizacion, "estado").unwrap_or_default();
    let mensajes = extraer_mensajes(autorizacion);

    if estado != "AUTORIZADO" {
        return Err(ImportacionError::NoAutorizado {
            estado: if estado.is_empty() {
                "DESCONOCIDO".to_string()
            } else {
                estado
            },
            mensajes: concatenar_mensajes(&mensajes),
        });
    }

    let comprobante = match texto_hijo(autorizacion, "comprobante") {
        Some(texto) => decodificar_entidades(&texto),
        None => {
            return Err(ImportacionError::RespuestaVacia {
                clave: clave.to_string(),
            })
        }
    };

    Ok(ComprobanteAutorizado {
        estado,
        numero_autorizacion: texto_hijo(autorizacion, "numeroAutorizacion"),
        fecha_autorizacion: texto_hijo(autorizacion, "fechaAutorizacion"),
        comprobante,
        mensajes,
    })
}
