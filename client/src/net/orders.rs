//! Telegram order endpoints: listing with filters, statistics, state changes.

#[cfg(test)]
#[path = "orders_test.rs"]
mod orders_test;

use time::Date;
use time::macros::format_description;

use super::api::ApiClient;
use super::error::ApiError;
use super::types::{CambiarEstadoRequest, Estadisticas, Pedido, PedidoEstado, PedidoPage, Prioridad};
use crate::config::DEFAULT_PAGE_LIMIT;

const PEDIDOS_PATH: &str = "/api/telegram/pedidos";
const ESTADISTICAS_PATH: &str = "/api/telegram/estadisticas";

const LIST_FAILED: &str = "failed to load orders";
const LIST_FORBIDDEN: &str = "you need the admin or staff role to view orders";
const STATS_FAILED: &str = "failed to load order statistics";
const CHANGE_FAILED: &str = "failed to change order state";

/// Error for a filter date that is not `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}': expected YYYY-MM-DD")]
pub struct InvalidDate(pub String);

/// Order list filters. Empty fields are left out of the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PedidoFilters {
    pub estado: Option<PedidoEstado>,
    pub prioridad: Option<Prioridad>,
    pub fecha_desde: Option<Date>,
    pub fecha_hasta: Option<Date>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for PedidoFilters {
    fn default() -> Self {
        Self { estado: None, prioridad: None, fecha_desde: None, fecha_hasta: None, limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl PedidoFilters {
    /// Drop every filter but keep paging.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self { limit: self.limit, offset: self.offset, ..Self::default() }
    }

    /// Query pairs in the order the server documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(estado) = self.estado {
            pairs.push(("estado", estado.as_str().to_owned()));
        }
        if let Some(prioridad) = self.prioridad {
            pairs.push(("prioridad", prioridad.as_str().to_owned()));
        }
        if let Some(desde) = self.fecha_desde {
            pairs.push(("fecha_desde", start_of_day_utc(desde)));
        }
        if let Some(hasta) = self.fecha_hasta {
            pairs.push(("fecha_hasta", start_of_day_utc(hasta)));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}

/// Parse a `YYYY-MM-DD` filter date.
///
/// # Errors
///
/// Returns [`InvalidDate`] for anything else.
pub fn parse_filter_date(raw: &str) -> Result<Date, InvalidDate> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw.trim(), &format).map_err(|_| InvalidDate(raw.to_owned()))
}

fn start_of_day_utc(date: Date) -> String {
    format!("{:04}-{:02}-{:02}T00:00:00.000Z", date.year(), u8::from(date.month()), date.day())
}

/// Whether assigning `next` to an order in `current` changes anything.
#[must_use]
pub fn needs_transition(current: PedidoEstado, next: PedidoEstado) -> bool {
    current != next && next != PedidoEstado::Other
}

fn estado_endpoint(id: i64) -> String {
    format!("{PEDIDOS_PATH}/{id}/cambiar-estado")
}

impl ApiClient {
    /// `GET /api/telegram/pedidos` with `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] when the role cannot see orders, and
    /// the usual transport/status errors otherwise.
    pub async fn list_pedidos(&self, token: &str, filters: &PedidoFilters) -> Result<Vec<Pedido>, ApiError> {
        let request = self.get(PEDIDOS_PATH, token).query(&filters.query_pairs());
        match self.send_json::<PedidoPage>(request, LIST_FAILED).await {
            Ok(page) => Ok(page.pedidos),
            Err(ApiError::Forbidden(_)) => Err(ApiError::Forbidden(LIST_FORBIDDEN.to_owned())),
            Err(e) => Err(e),
        }
    }

    /// `GET /api/telegram/estadisticas`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn estadisticas(&self, token: &str) -> Result<Estadisticas, ApiError> {
        self.send_json(self.get(ESTADISTICAS_PATH, token), STATS_FAILED).await
    }

    /// `POST /api/telegram/pedidos/{id}/cambiar-estado`.
    ///
    /// The server notifies the customer through Telegram on success.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn cambiar_estado(&self, token: &str, id: i64, nuevo_estado: PedidoEstado) -> Result<(), ApiError> {
        let request = self.post(&estado_endpoint(id), token).json(&CambiarEstadoRequest { nuevo_estado });
        self.send_unit(request, CHANGE_FAILED).await?;
        tracing::info!(pedido_id = id, estado = %nuevo_estado, "order state changed");
        Ok(())
    }
}
