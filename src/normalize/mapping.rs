//! Header vocabularies of the exporting tools.
//!
//! Order matters: when two source headers map to the same canonical name
//! and both are present, the later entry wins.

pub const TESTS_KEY_MAPPING: &[(&str, &str)] = &[
    ("Ubicación", "site"),
    ("BW Bajada Esperado", "exp_dn_br"),
    ("BW Bajada Encontrado", "dn_br"),
    ("BW Subida Esperado", "exp_up_br"),
    ("BW Subida Encontrado", "up_br"),
    ("Resultado", "res"),
    ("Fecha de la Prueba", "timestamp"),
    ("Hora de la Prueba", "hour"),
    ("Perfil de Velocidad", "profile"),
    ("Tipo de prueba", "type"),
    ("Tipo de Prueba", "type"),
    ("Error", "error"),
    ("origin_file", "origin_file"),
];

pub const LOCATIONS_KEY_MAPPING: &[(&str, &str)] = &[
    ("Sitio (código)", "site_code"),
    ("ID Beneficiario", "ben_id"),
];

pub const TICKETS_KEY_MAPPING: &[(&str, &str)] = &[
    ("ID_BENEFICIARIO", "ben_id"),
    ("ID_MINTIC", "site_code"),
    ("FECHA_HORA_DE_APERTURA", "start"),
    ("FECHA_HORA_DE_RESOLUCION", "end"),
];

/// Provenance labels attached to the two test exports.
pub const OPERATIONAL_ORIGIN: &str = "operativos";
pub const NON_OPERATIONAL_ORIGIN: &str = "no operativos";
