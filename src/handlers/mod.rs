pub mod entregas;
pub mod novedades;
pub mod productos;
pub mod proformas;
pub mod reservas;
pub mod rutas;
pub mod ventas;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::entregas::EntregaService;
use crate::services::novedades::NovedadService;
use crate::services::proformas::ProformaService;
use crate::services::reservas::{ExpiryPolicy, ReservationService};
use crate::services::rutas::RutaService;
use crate::services::stock::StockService;
use crate::services::ventas::VentaService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub stock: Arc<StockService>,
    pub reservas: Arc<ReservationService>,
    pub proformas: Arc<ProformaService>,
    pub ventas: Arc<VentaService>,
    pub entregas: Arc<EntregaService>,
    pub novedades: Arc<NovedadService>,
    pub rutas: Arc<RutaService>,
}

impl AppServices {
    /// Builds the service container shared by all HTTP handlers.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, policy: ExpiryPolicy) -> Self {
        let stock = Arc::new(StockService::new(db_pool.clone()));
        let reservas = ReservationService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
            policy,
        );
        let proformas = Arc::new(ProformaService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
            reservas.clone(),
        ));
        let ventas = Arc::new(VentaService::new(db_pool.clone()));
        let entregas = Arc::new(EntregaService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let novedades = Arc::new(NovedadService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let rutas = Arc::new(RutaService::new(db_pool, Some(event_sender)));

        Self {
            stock,
            reservas: Arc::new(reservas),
            proformas,
            ventas,
            entregas,
            novedades,
            rutas,
        }
    }
}
