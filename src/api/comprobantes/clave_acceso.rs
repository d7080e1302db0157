use crate::api::comprobantes::error_handling::ImportacionError;
use crate::api::comprobantes::models::ClaveAccesoCampos;

// ============================================================================
// CODEC DE CLAVE DE ACCESO
// ============================================================================

/// Longitud fija de la clave de acceso emitida por el SRI.
pub const LONGITUD_CLAVE: usize = 49;

/// Descompone la clave de acceso de 49 dígitos en sus campos estructurales.
///
/// Es una función pura sin I/O; debe llamarse antes de cualquier consulta
/// remota para descartar claves mal formadas sin gastar la llamada de red.
/// El dígito verificador se extrae pero no se recalcula.
pub fn decodificar(clave: &str) -> Result<ClaveAccesoCampos, ImportacionError> {
    if clave.len() != LONGITUD_CLAVE {
        return Err(ImportacionError::ClaveInvalida {
            clave: clave.to_string(),
            detalle: format!(
                "longitud {} (se esperan {} dígitos)",
                clave.len(),
                LONGITUD_CLAVE
            ),
        });
    }

    if !clave.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ImportacionError::ClaveInvalida {
            clave: clave.to_string(),
            detalle: "contiene caracteres no numéricos".to_string(),
        });
    }

    // Posiciones fijas: fecha(8) tipo(2) ruc(13) ambiente(2) estab(3)
    // ptoEmi(3) secuencial(9) codigoNumerico(8) verificador(1).
    let fecha_emision = &clave[0..8];
    let tipo_comprobante = &clave[8..10];
    let ruc = &clave[10..23];
    let tipo_ambiente = &clave[23..25];
    let establecimiento = &clave[25..28];
    let punto_emision = &clave[28..31];
    let secuencial = &clave[31..40];
    let codigo_numerico = &clave[40..48];
    let digito_verificador = &clave[48..49];

    let fecha_formateada = format!(
        "{}/{}/{}",
        &fecha_emision[0..2],
        &fecha_emision[2..4],
        &fecha_emision[4..8]
    );

    Ok(ClaveAccesoCampos {
        fecha_emision: fecha_emision.to_string(),
        fecha_formateada,
        tipo_comprobante: tipo_comprobante.to_string(),
        ruc: ruc.to_string(),
        tipo_ambiente: tipo_ambiente.to_string(),
        establecimiento: establecimiento.to_string(),
        punto_emision: punto_emision.to_string(),
        secuencial: secuencial.to_string(),
        codigo_numerico: codigo_numerico.to_string(),
        digito_verificador: digito_verificador.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAVE_VALIDA: &str = "2306202501099283763500120010010000000123123456784";

    #[test]
    fn test_decodificar_clave_valida() {
        let campos = decodificar(CLAVE_VALIDA).unwrap();

        assert_eq!(campos.fecha_emision, "23062025");
        assert_eq!(campos.fecha_formateada, "23/06/2025");
        assert_eq!(campos.tipo_comprobante, "01");
        assert_eq!(campos.ruc, "0992837635001");
        assert_eq!(campos.tipo_ambiente, "20");
        assert_eq!(campos.establecimiento, "010");
        assert_eq!(campos.punto_emision, "010");
        assert_eq!(campos.secuencial, "000000123");
        assert_eq!(campos.codigo_numerico, "12345678");
        assert_eq!(campos.digito_verificador, "4");
    }

    #[test]
    fn test_campos_reconstruyen_la_clave() {
        let campos = decodificar(CLAVE_VALIDA).unwrap();

        let reconstruida = format!(
            "{}{}{}{}{}{}{}{}{}",
            campos.fecha_emision,
            campos.tipo_comprobante,
            campos.ruc,
            campos.tipo_ambiente,
            campos.establecimiento,
            campos.punto_emision,
            campos.secuencial,
            campos.codigo_numerico,
            campos.digito_verificador,
        );
        assert_eq!(reconstruida, CLAVE_VALIDA);
    }

    #[test]
    fn test_longitud_incorrecta() {
        let corta = "1".repeat(48);
        let larga = "1".repeat(50);
        for clave in ["", "123", corta.as_str(), larga.as_str()] {
            let err = decodificar(clave).unwrap_err();
            assert!(matches!(err, ImportacionError::ClaveInvalida { .. }));
        }
    }

    #[test]
    fn test_caracteres_no_numericos() {
        let clave = format!("{}X", "1".repeat(48));
        let err = decodificar(&clave).unwrap_err();
        assert!(matches!(err, ImportacionError::ClaveInvalida { .. }));

        // Multibyte: la longitud en bytes tampoco es 49, nunca llega al slicing
        let clave_unicode = format!("{}ñ", "1".repeat(48));
        assert!(decodificar(&clave_unicode).is_err());
    }

    #[test]
    fn test_decodificar_es_total_sobre_claves_validas() {
        // Cualquier cadena de 49 dígitos decodifica sin pánico
        for relleno in ["0", "5", "9"] {
            let clave = relleno.repeat(49);
            let campos = decodificar(&clave).unwrap();
            assert_eq!(campos.secuencial.len(), 9);
            assert_eq!(campos.codigo_numerico.len(), 8);
        }
    }
}
