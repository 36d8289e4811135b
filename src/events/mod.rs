use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod broadcast;

/// Domain events emitted by the services. Business code only ever sends
/// these typed values; shaping them for the realtime channel happens in
/// the [`broadcast`] adapter, never inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    VentaCreada {
        venta_id: Uuid,
        numero: String,
        cliente_id: Uuid,
        total: Decimal,
        estado: String,
        timestamp: DateTime<Utc>,
    },
    NovedadReportada {
        novedad_id: Uuid,
        entrega_id: Uuid,
        entrega_numero: String,
        tipo: String,
        descripcion: String,
        reportado_por: String,
        reportado_en: DateTime<Utc>,
        foto_url: Option<String>,
    },
    ReservasRenovadas {
        proforma_id: Uuid,
        renovadas: u32,
        nuevo_vencimiento: DateTime<Utc>,
    },
    ReservaLiberada {
        reserva_id: Uuid,
        producto_id: Uuid,
        cantidad: i32,
    },
    EntregaEstadoCambiado {
        entrega_id: Uuid,
        estado_anterior: String,
        estado_nuevo: String,
    },
    RutaCreada {
        ruta_id: Uuid,
        zona: String,
        paradas: u32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes the event channel and hands each event to the broadcast
/// adapter. Runs for the lifetime of the process; ending means the last
/// sender was dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match broadcast::format(&event) {
            Some(message) => {
                // The realtime transport is an external collaborator; the
                // formatted payload is logged and handed off at this seam.
                info!(
                    canal = %message.canal,
                    evento = %message.evento,
                    payload = %message.payload,
                    "Publishing broadcast event"
                );
            }
            None => {
                info!("No broadcast mapping for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}
