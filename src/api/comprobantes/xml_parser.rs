use regex::Regex;
use rust_decimal::Decimal;
use sxd_document::dom::{ChildOfElement, Document, Element};
use sxd_document::parser;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{evaluate_xpath, Value};

use crate::api::comprobantes::error_handling::ImportacionError;
use crate::api::comprobantes::models::{
    ComprobanteNormalizado, LineaImpuesto, LineaPago, TipoComprobante,
};

// ============================================================================
// NORMALIZACIÓN DE NAMESPACES
// ============================================================================

/// Elimina los prefijos de namespace de los nombres de elemento y las
/// declaraciones xmlns. El mismo campo lógico puede llegar con distintos
/// prefijos según el tipo de documento, así que la búsqueda de campos se
/// hace siempre sobre nombres sin prefijo.
pub fn quitar_prefijos(xml: &str) -> String {
    let prefijos = Regex::new(r"<(/?)[A-Za-z_][A-Za-z0-9._-]*:")
        .expect("expresión regular de prefijos inválida");
    let declaraciones = Regex::new(r#"\s+xmlns(:[A-Za-z0-9._-]+)?\s*=\s*("[^"]*"|'[^']*')"#)
        .expect("expresión regular de xmlns inválida");

    let sin_prefijos = prefijos.replace_all(xml, "<$1");
    declaraciones.replace_all(&sin_prefijos, "").into_owned()
}

// ============================================================================
// HELPERS DE EXTRACCIÓN
// ============================================================================

/// Evalúa un XPath y devuelve los elementos del nodeset en orden de documento.
pub(crate) fn elementos_xpath<'d>(documento: &'d Document<'d>, expr: &str) -> Vec<Element<'d>> {
    match evaluate_xpath(documento, expr) {
        Ok(Value::Nodeset(nodos)) => nodos
            .document_order()
            .into_iter()
            .filter_map(|n| match n {
                Node::Element(e) => Some(e),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn hijos_elementos<'d>(elemento: Element<'d>) -> Vec<Element<'d>> {
    elemento
        .children()
        .into_iter()
        .filter_map(|c| match c {
            ChildOfElement::Element(e) => Some(e),
            _ => None,
        })
        .collect()
}

pub(crate) fn hijo<'d>(elemento: Element<'d>, nombre: &str) -> Option<Element<'d>> {
    hijos_elementos(elemento)
        .into_iter()
        .find(|e| e.name().local_part() == nombre)
}

pub(crate) fn texto_elemento(elemento: Element<'_>) -> String {
    elemento
        .children()
        .into_iter()
        .filter_map(|c| match c {
            ChildOfElement::Text(t) => Some(t.text().to_string()),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn texto_hijo(elemento: Element<'_>, nombre: &str) -> Option<String> {
    hijo(elemento, nombre)
        .map(texto_elemento)
        .filter(|s| !s.is_empty())
}

/// Campo monetario opcional: ausente o no numérico se interpreta como 0.
fn decimal_hijo(elemento: Element<'_>, nombre: &str) -> Decimal {
    texto_hijo(elemento, nombre)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default()
}

// ============================================================================
// PARSER DE COMPROBANTES
// ============================================================================

const RAICES_CONOCIDAS: [&str; 5] = [
    "factura",
    "notaCredito",
    "notaDebito",
    "comprobanteRetencion",
    "guiaRemision",
];

const BLOQUES_INFO: [&str; 3] = ["infoFactura", "infoNotaCredito", "infoNotaDebito"];

/// Normaliza el XML de un comprobante electrónico a un conjunto plano de
/// campos, sin importar bajo cuál de los cinco tipos de documento llegó.
pub fn parsear(xml: &str) -> Result<ComprobanteNormalizado, ImportacionError> {
    let limpio = quitar_prefijos(xml);

    let paquete = parser::parse(&limpio).map_err(|e| ImportacionError::ErrorParseo {
        detalle: format!("XML mal formado: {}", e),
    })?;
    let documento = paquete.as_document();

    // Despacho por presencia de uno de los cinco elementos raíz conocidos
    let raiz = RAICES_CONOCIDAS
        .iter()
        .find_map(|nombre| {
            elementos_xpath(&documento, &format!("//{}", nombre))
                .into_iter()
                .next()
        })
        .ok_or_else(|| ImportacionError::ErrorParseo {
            detalle: "tipo de documento desconocido".to_string(),
        })?;

    let tipo = TipoComprobante::desde_raiz(raiz.name().local_part())
        .ok_or_else(|| ImportacionError::ErrorParseo {
            detalle: format!("tipo de documento desconocido: {}", raiz.name().local_part()),
        })?;

    // infoTributaria: identidad del emisor y numeración del documento
    let info_tributaria = elementos_xpath(&documento, "//infoTributaria")
        .into_iter()
        .next();

    let mut comprobante = ComprobanteNormalizado {
        tipo,
        ruc_emisor: String::new(),
        razon_social_emisor: String::new(),
        nombre_comercial_emisor: String::new(),
        dir_matriz_emisor: String::new(),
        clave_acceso: String::new(),
        establecimiento: String::new(),
        punto_emision: String::new(),
        secuencial: String::new(),
        fecha_emision: String::new(),
        tipo_identificacion_comprador: String::new(),
        identificacion_comprador: String::new(),
        razon_social_comprador: String::new(),
        direccion_comprador: String::new(),
        total_sin_impuestos: Decimal::ZERO,
        total_descuento: Decimal::ZERO,
        propina: Decimal::ZERO,
        importe_total: Decimal::ZERO,
        moneda: String::new(),
        impuestos: Vec::new(),
        pagos: Vec::new(),
    };

    if let Some(tributaria) = info_tributaria {
        comprobante.ruc_emisor = texto_hijo(tributaria, "ruc").unwrap_or_default();
        comprobante.razon_social_emisor =
            texto_hijo(tributaria, "razonSocial").unwrap_or_default();
        comprobante.nombre_comercial_emisor =
            texto_hijo(tributaria, "nombreComercial").unwrap_or_default();
        comprobante.dir_matriz_emisor = texto_hijo(tributaria, "dirMatriz").unwrap_or_default();
        comprobante.clave_acceso = texto_hijo(tributaria, "claveAcceso").unwrap_or_default();
        comprobante.establecimiento = texto_hijo(tributaria, "estab").unwrap_or_default();
        comprobante.punto_emision = texto_hijo(tributaria, "ptoEmi").unwrap_or_default();
        comprobante.secuencial = texto_hijo(tributaria, "secuencial").unwrap_or_default();
    }

    // El bloque de información del documento se resuelve por la presencia de
    // fechaEmision. Retenciones y guías no lo traen; en ese caso los montos
    // quedan en cero y la fecha vacía.
    let bloque_info = BLOQUES_INFO
        .iter()
        .filter_map(|nombre| {
            elementos_xpath(&documento, &format!("//{}", nombre))
                .into_iter()
                .next()
        })
        .find(|bloque| texto_hijo(*bloque, "fechaEmision").is_some());

    if let Some(info) = bloque_info {
        comprobante.fecha_emision = texto_hijo(info, "fechaEmision").unwrap_or_default();
        comprobante.tipo_identificacion_comprador =
            texto_hijo(info, "tipoIdentificacionComprador").unwrap_or_default();
        comprobante.identificacion_comprador =
            texto_hijo(info, "identificacionComprador").unwrap_or_default();
        comprobante.razon_social_comprador =
            texto_hijo(info, "razonSocialComprador").unwrap_or_default();
        comprobante.direccion_comprador =
            texto_hijo(info, "direccionComprador").unwrap_or_default();
        comprobante.total_sin_impuestos = decimal_hijo(info, "totalSinImpuestos");
        comprobante.total_descuento = decimal_hijo(info, "totalDescuento");
        comprobante.propina = decimal_hijo(info, "propina");
        comprobante.moneda = texto_hijo(info, "moneda").unwrap_or_default();

        // El total llega con nombre distinto según el tipo de documento
        comprobante.importe_total = ["importeTotal", "valorModificacion", "valorTotal"]
            .iter()
            .find_map(|nombre| texto_hijo(info, nombre))
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_default();
    }

    comprobante.impuestos = extraer_impuestos(&documento);
    comprobante.pagos = extraer_pagos(&documento);

    Ok(comprobante)
}

/// Las colecciones de una sola entrada llegan igual que las de varias; el
/// nodeset se normaliza siempre a lista.
fn extraer_impuestos<'d>(documento: &'d Document<'d>) -> Vec<LineaImpuesto> {
    let mut nodos = elementos_xpath(documento, "//totalConImpuestos/totalImpuesto");
    if nodos.is_empty() {
        nodos = elementos_xpath(documento, "//infoNotaDebito/impuestos/impuesto");
    }

    nodos
        .into_iter()
        .map(|nodo| LineaImpuesto {
            codigo: texto_hijo(nodo, "codigo").unwrap_or_default(),
            codigo_porcentaje: texto_hijo(nodo, "codigoPorcentaje").unwrap_or_default(),
            base_imponible: decimal_hijo(nodo, "baseImponible"),
            tarifa: decimal_hijo(nodo, "tarifa"),
            valor: decimal_hijo(nodo, "valor"),
        })
        .collect()
}

fn extraer_pagos<'d>(documento: &'d Document<'d>) -> Vec<LineaPago> {
    elementos_xpath(documento, "//pagos/pago")
        .into_iter()
        .map(|nodo| LineaPago {
            forma_pago: texto_hijo(nodo, "formaPago").unwrap_or_default(),
            total: decimal_hijo(nodo, "total"),
            plazo: texto_hijo(nodo, "plazo").and_then(|s| s.trim().parse().ok()),
            unidad_tiempo: texto_hijo(nodo, "unidadTiempo"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTURA_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<factura id="comprobante" version="2.0.0">
  <infoTributaria>
    <ambiente>2</ambiente>
    <razonSocial>COMERCIAL ANDINA S.A.</razonSocial>
    <nombreComercial>ANDINA</nombreComercial>
    <ruc>0992837635001</ruc>
    <claveAcceso>2306202501099283763500120010010000001231234567814</claveAcceso>
    <codDoc>01</codDoc>
    <estab>001</estab>
    <ptoEmi>002</ptoEmi>
    <secuencial>000000123</secuencial>
    <dirMatriz>Av. Amazonas N24-03</dirMatriz>
  </infoTributaria>
  <infoFactura>
    <fechaEmision>23/06/2025</fechaEmision>
    <tipoIdentificacionComprador>04</tipoIdentificacionComprador>
    <razonSocialComprador>DISTRIBUIDORA DEL SUR CIA LTDA</razonSocialComprador>
    <identificacionComprador>1790012345001</identificacionComprador>
    <direccionComprador>Av. Quitumbe</direccionComprador>
    <totalSinImpuestos>150.00</totalSinImpuestos>
    <totalDescuento>5.00</totalDescuento>
    <totalConImpuestos>
      <totalImpuesto>
        <codigo>2</codigo>
        <codigoPorcentaje>4</codigoPorcentaje>
        <baseImponible>100.00</baseImponible>
        <valor>15.00</valor>
      </totalImpuesto>
      <totalImpuesto>
        <codigo>2</codigo>
        <codigoPorcentaje>0</codigoPorcentaje>
        <baseImponible>50.00</baseImponible>
        <valor>0.00</valor>
      </totalImpuesto>
    </totalConImpuestos>
    <propina>0.00</propina>
    <importeTotal>165.00</importeTotal>
    <moneda>DOLAR</moneda>
    <pagos>
      <pago>
        <formaPago>20</formaPago>
        <total>165.00</total>
        <plazo>30</plazo>
        <unidadTiempo>dias</unidadTiempo>
      </pago>
    </pagos>
  </infoFactura>
</factura>"#;

    #[test]
    fn test_parsear_factura() {
        let comprobante = parsear(FACTURA_XML).unwrap();

        assert_eq!(comprobante.tipo, TipoComprobante::Factura);
        assert_eq!(comprobante.ruc_emisor, "0992837635001");
        assert_eq!(comprobante.razon_social_emisor, "COMERCIAL ANDINA S.A.");
        assert_eq!(comprobante.establecimiento, "001");
        assert_eq!(comprobante.punto_emision, "002");
        assert_eq!(comprobante.secuencial, "000000123");
        assert_eq!(comprobante.fecha_emision, "23/06/2025");
        assert_eq!(comprobante.identificacion_comprador, "1790012345001");
        assert_eq!(comprobante.total_sin_impuestos, Decimal::new(15000, 2));
        assert_eq!(comprobante.importe_total, Decimal::new(16500, 2));
        assert_eq!(comprobante.impuestos.len(), 2);
        assert_eq!(comprobante.pagos.len(), 1);
        assert_eq!(comprobante.pagos[0].forma_pago, "20");
        assert_eq!(comprobante.pagos[0].plazo, Some(Decimal::new(30, 0)));
    }

    #[test]
    fn test_impuesto_unico_se_normaliza_a_lista() {
        let xml = r#"<factura>
  <infoTributaria><ruc>0992837635001</ruc></infoTributaria>
  <infoFactura>
    <fechaEmision>01/01/2025</fechaEmision>
    <totalConImpuestos>
      <totalImpuesto>
        <codigo>2</codigo>
        <codigoPorcentaje>4</codigoPorcentaje>
        <baseImponible>10.00</baseImponible>
        <valor>1.50</valor>
      </totalImpuesto>
    </totalConImpuestos>
    <importeTotal>11.50</importeTotal>
  </infoFactura>
</factura>"#;

        let comprobante = parsear(xml).unwrap();
        assert_eq!(comprobante.impuestos.len(), 1);
        assert_eq!(comprobante.impuestos[0].base_imponible, Decimal::new(1000, 2));
    }

    #[test]
    fn test_prefijos_de_namespace_se_ignoran() {
        let xml = r#"<ns2:factura xmlns:ns2="http://www.sri.gob.ec/comprobantes">
  <ns2:infoTributaria><ns2:ruc>0992837635001</ns2:ruc></ns2:infoTributaria>
  <ns2:infoFactura>
    <ns2:fechaEmision>05/03/2025</ns2:fechaEmision>
    <ns2:importeTotal>20.00</ns2:importeTotal>
  </ns2:infoFactura>
</ns2:factura>"#;

        let comprobante = parsear(xml).unwrap();
        assert_eq!(comprobante.tipo, TipoComprobante::Factura);
        assert_eq!(comprobante.ruc_emisor, "0992837635001");
        assert_eq!(comprobante.fecha_emision, "05/03/2025");
        assert_eq!(comprobante.importe_total, Decimal::new(2000, 2));
    }

    #[test]
    fn test_nota_credito_usa_valor_modificacion() {
        let xml = r#"<notaCredito>
  <infoTributaria><ruc>0992837635001</ruc></infoTributaria>
  <infoNotaCredito>
    <fechaEmision>10/04/2025</fechaEmision>
    <totalSinImpuestos>30.00</totalSinImpuestos>
    <valorModificacion>34.50</valorModificacion>
  </infoNotaCredito>
</notaCredito>"#;

        let comprobante = parsear(xml).unwrap();
        assert_eq!(comprobante.tipo, TipoComprobante::NotaCredito);
        assert_eq!(comprobante.importe_total, Decimal::new(3450, 2));
    }

    #[test]
    fn test_retencion_sin_bloque_info() {
        let xml = r#"<comprobanteRetencion>
  <infoTributaria>
    <ruc>0992837635001</ruc>
    <claveAcceso>2306202507099283763500120010010000001231234567814</claveAcceso>
  </infoTributaria>
  <infoCompRetencion>
    <fechaEmision>23/06/2025</fechaEmision>
  </infoCompRetencion>
</comprobanteRetencion>"#;

        let comprobante = parsear(xml).unwrap();
        assert_eq!(comprobante.tipo, TipoComprobante::ComprobanteRetencion);
        // Sin infoFactura/infoNotaCredito/infoNotaDebito los montos quedan en cero
        assert_eq!(comprobante.fecha_emision, "");
        assert_eq!(comprobante.importe_total, Decimal::ZERO);
        assert!(comprobante.impuestos.is_empty());
    }

    #[test]
    fn test_documento_desconocido() {
        let err = parsear("<liquidacionCompra><x>1</x></liquidacionCompra>").unwrap_err();
        assert!(matches!(err, ImportacionError::ErrorParseo { .. }));
    }

    #[test]
    fn test_xml_mal_formado() {
        let err = parsear("<factura><sinCerrar>").unwrap_err();
        assert!(matches!(err, ImportacionError::ErrorParseo { .. }));
    }

    #[test]
    fn test_montos_ausentes_default_cero() {
        let xml = r#"<notaDebito>
  <infoTributaria><ruc>0992837635001</ruc></infoTributaria>
  <infoNotaDebito>
    <fechaEmision>12/12/2025</fechaEmision>
    <valorTotal>no-numerico</valorTotal>
  </infoNotaDebito>
</notaDebito>"#;

        let comprobante = parsear(xml).unwrap();
        assert_eq!(comprobante.importe_total, Decimal::ZERO);
        assert_eq!(comprobante.total_sin_impuestos, Decimal::ZERO);
    }

    #[test]
    fn test_quitar_prefijos_conserva_atributos() {
        let limpio = quitar_prefijos(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body atributo="a:b"/></soap:Envelope>"#,
        );
        assert!(limpio.contains("<Envelope"));
        assert!(limpio.contains("<Body atributo=\"a:b\""));
        assert!(!limpio.contains("xmlns"));
    }
}
