pub mod entregas;
pub mod novedades;
pub mod proformas;
pub mod reservas;
pub mod rutas;
pub mod stock;
pub mod ventas;
