// Importación de comprobantes electrónicos autorizados por el SRI
// hacia el libro de ventas.

pub mod autorizacion_service;
pub mod clave_acceso;
pub mod error_handling;
pub mod handlers;
pub mod import_service;
pub mod models;
pub mod repository;
pub mod tax_mapper;
pub mod xml_parser;

pub use error_handling::ImportacionError;
pub use models::*;
