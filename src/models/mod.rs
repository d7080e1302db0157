pub mod audit_log;
pub mod venta;

pub use audit_log::{AccionAuditoria, EventoAuditoria, RegistroAuditoria};
pub use venta::{EstadoVenta, Venta, VentaNueva, VentaResumen};
