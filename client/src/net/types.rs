//! Wire DTOs for the pedidos REST API.
//!
//! DESIGN
//! ======
//! Field names follow the server's JSON (`full_name`, `is_active`, Spanish
//! order fields) through serde renames, so Rust code reads in its own terms
//! while round-trips with the server stay lossless.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// IDENTITY
// =============================================================================

/// Access tier of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Staff, Role::User];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::User => "user",
        }
    }

    /// One-line summary of what the role is allowed to do.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Admin => "Administrator: full system access",
            Self::Staff => "Staff: manages orders and views statistics",
            Self::User => "User: basic access",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role '{other}' (expected admin, staff or user)")),
        }
    }
}

/// The authenticated user's profile record as returned by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-assigned identifier; numeric ids are kept in string form.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(rename = "full_name", default)]
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(rename = "is_active", default = "default_active")]
    pub active: bool,
    /// ISO 8601 timestamp, kept as sent.
    pub created_at: String,
    #[serde(rename = "is_email_verified", default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl Identity {
    /// Display name when set, otherwise the email address.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

fn default_active() -> bool {
    true
}

/// Successful login/register payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
}

/// Body of `PUT /api/users/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: String,
}

/// Body of `PUT /api/users/{id}` (admin edit).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl UserUpdate {
    /// Start an edit from the user's current server state.
    #[must_use]
    pub fn from_identity(user: &Identity) -> Self {
        Self {
            email: user.email.clone(),
            full_name: user.display_name.clone().unwrap_or_default(),
            role: user.role,
            is_active: user.active,
        }
    }
}

// =============================================================================
// ORDERS
// =============================================================================

/// Order lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedidoEstado {
    PendienteConfirmacion,
    Confirmado,
    EnPreparacion,
    ListoParaRecoger,
    Completado,
    Cancelado,
    /// A state this client does not know yet.
    #[serde(other)]
    Other,
}

impl PedidoEstado {
    /// States an operator may assign, in workflow order.
    pub const ASSIGNABLE: [PedidoEstado; 6] = [
        PedidoEstado::PendienteConfirmacion,
        PedidoEstado::Confirmado,
        PedidoEstado::EnPreparacion,
        PedidoEstado::ListoParaRecoger,
        PedidoEstado::Completado,
        PedidoEstado::Cancelado,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendienteConfirmacion => "pendiente_confirmacion",
            Self::Confirmado => "confirmado",
            Self::EnPreparacion => "en_preparacion",
            Self::ListoParaRecoger => "listo_para_recoger",
            Self::Completado => "completado",
            Self::Cancelado => "cancelado",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PendienteConfirmacion => "Pending confirmation",
            Self::Confirmado => "Confirmed",
            Self::EnPreparacion => "In preparation",
            Self::ListoParaRecoger => "Ready for pickup",
            Self::Completado => "Completed",
            Self::Cancelado => "Cancelled",
            Self::Other => "Unknown",
        }
    }
}

impl fmt::Display for PedidoEstado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PedidoEstado {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ASSIGNABLE
            .into_iter()
            .find(|estado| estado.as_str() == wanted)
            .ok_or_else(|| format!("unknown order state '{wanted}'"))
    }
}

/// Order priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prioridad {
    Alta,
    Media,
    Baja,
    #[serde(other)]
    Other,
}

impl Prioridad {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alta => "alta",
            Self::Media => "media",
            Self::Baja => "baja",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Prioridad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prioridad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alta" => Ok(Self::Alta),
            "media" => Ok(Self::Media),
            "baja" => Ok(Self::Baja),
            other => Err(format!("unknown priority '{other}' (expected alta, media or baja)")),
        }
    }
}

/// An order captured through the Telegram bot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pedido {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub estado: PedidoEstado,
    pub prioridad: Prioridad,
    #[serde(default)]
    pub resumen_items: String,
    #[serde(default)]
    pub telegram_username: Option<String>,
    #[serde(default)]
    pub telegram_user_id: Option<i64>,
    /// Requested pickup date (`YYYY-MM-DD` or ISO 8601).
    #[serde(default)]
    pub fecha_solicitada: Option<String>,
    #[serde(default)]
    pub hora_solicitada: Option<String>,
    #[serde(default)]
    pub asignado_a: Option<String>,
    pub fecha_creacion: String,
    #[serde(default)]
    pub notas_adicionales: Option<String>,
}

impl Pedido {
    /// Telegram handle, or the numeric Telegram id when no handle is set.
    #[must_use]
    pub fn customer(&self) -> String {
        match (&self.telegram_username, self.telegram_user_id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("ID: {id}"),
            _ => "unknown".to_owned(),
        }
    }
}

/// `GET /api/telegram/pedidos` response envelope.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PedidoPage {
    #[serde(default)]
    pub pedidos: Vec<Pedido>,
}

#[derive(Debug, Serialize)]
pub struct CambiarEstadoRequest {
    pub nuevo_estado: PedidoEstado,
}

/// Aggregate order counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estadisticas {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub total_pedidos: i64,
    /// Counts keyed by raw state name.
    #[serde(default)]
    pub pedidos_por_estado: BTreeMap<String, i64>,
}

impl Estadisticas {
    /// Count for one state, zero when the server omitted it.
    #[must_use]
    pub fn count(&self, estado: PedidoEstado) -> i64 {
        self.pedidos_por_estado.get(estado.as_str()).copied().unwrap_or(0)
    }
}

// =============================================================================
// ERROR BODY
// =============================================================================

/// Error envelope: `detail` is a message string or a list of validation items.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

// =============================================================================
// DESERIALIZERS
// =============================================================================

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(D::Error::custom("expected non-empty string or number id")),
    }
}

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(float as i64);
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("expected integer, got '{s}'"))),
        _ => Err(D::Error::custom("expected number")),
    }
}
