pub mod entrega;
pub mod entrega_ubicacion;
pub mod novedad;
pub mod producto;
pub mod proforma;
pub mod proforma_linea;
pub mod reserva;
pub mod ruta;
pub mod ruta_parada;
pub mod venta;
