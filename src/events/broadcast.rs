//! Wire formatting for the realtime notification channel.
//!
//! Keeps transport payload shapes out of the services: each domain event
//! maps to a channel name, an event name and a JSON body with the exact
//! field spelling the front end subscribes to.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::Event;

/// A formatted message ready for the broadcast transport.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub canal: String,
    pub evento: String,
    pub payload: serde_json::Value,
}

#[derive(Serialize)]
struct VentaCreadaPayload {
    id: Uuid,
    numero: String,
    cliente_id: Uuid,
    total: Decimal,
    estado: String,
    timestamp: DateTime<Utc>,
}

// The incident feed predates the snake_case convention; its subscribers
// expect camelCase keys and `fotoURL`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NovedadReportadaPayload {
    id: Uuid,
    entrega_id: Uuid,
    entrega_numero: String,
    tipo: String,
    descripcion: String,
    reportado_por: String,
    reportado_en: DateTime<Utc>,
    #[serde(rename = "fotoURL", skip_serializing_if = "Option::is_none")]
    foto_url: Option<String>,
}

/// Maps a domain event to its broadcast message, or `None` for events that
/// stay internal.
pub fn format(event: &Event) -> Option<BroadcastMessage> {
    match event {
        Event::VentaCreada {
            venta_id,
            numero,
            cliente_id,
            total,
            estado,
            timestamp,
        } => {
            let payload = VentaCreadaPayload {
                id: *venta_id,
                numero: numero.clone(),
                cliente_id: *cliente_id,
                total: *total,
                estado: estado.clone(),
                timestamp: *timestamp,
            };
            Some(BroadcastMessage {
                canal: "ventas".to_string(),
                evento: "venta.creada".to_string(),
                payload: serde_json::to_value(payload).ok()?,
            })
        }
        Event::NovedadReportada {
            novedad_id,
            entrega_id,
            entrega_numero,
            tipo,
            descripcion,
            reportado_por,
            reportado_en,
            foto_url,
        } => {
            let payload = NovedadReportadaPayload {
                id: *novedad_id,
                entrega_id: *entrega_id,
                entrega_numero: entrega_numero.clone(),
                tipo: tipo.clone(),
                descripcion: descripcion.clone(),
                reportado_por: reportado_por.clone(),
                reportado_en: *reportado_en,
                foto_url: foto_url.clone(),
            };
            Some(BroadcastMessage {
                canal: "novedades".to_string(),
                evento: "novedad.reportada".to_string(),
                payload: serde_json::to_value(payload).ok()?,
            })
        }
        // Internal bookkeeping events never reach the realtime channel.
        Event::ReservasRenovadas { .. }
        | Event::ReservaLiberada { .. }
        | Event::EntregaEstadoCambiado { .. }
        | Event::RutaCreada { .. } => None,
    }
}
