//! Plain-text views. Every function returns the finished text; `main` prints.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use pedidos_client::net::types::{Estadisticas, Pedido, PedidoEstado};
use pedidos_client::net::users::UserCounts;
use pedidos_client::router::{DASHBOARD_PATH, ESTADISTICAS_PATH, PEDIDOS_PATH, PROFILE_PATH, USERS_PATH};
use pedidos_client::{Decision, Identity, Session};

const ITEMS_WIDTH: usize = 40;

/// Menu label for a navigable path.
pub fn route_label(path: &str) -> &str {
    match path {
        DASHBOARD_PATH => "Dashboard",
        PROFILE_PATH => "My profile",
        PEDIDOS_PATH => "Telegram orders",
        ESTADISTICAS_PATH => "Order statistics",
        USERS_PATH => "User management",
        other => other,
    }
}

pub fn dashboard(identity: &Identity, routes: &[&str]) -> String {
    let mut lines = vec![
        format!("Welcome, {}", identity.label()),
        format!("role: {} ({})", identity.role, identity.role.description()),
        String::new(),
        "views:".to_owned(),
    ];
    lines.extend(routes.iter().map(|path| format!("  {:<16} {}", path, route_label(path))));
    join(lines)
}

pub fn identity(user: &Identity) -> String {
    let mut lines = vec![
        format!("id:       {}", user.id),
        format!("email:    {}", user.email),
        format!("name:     {}", user.display_name.as_deref().unwrap_or("-")),
        format!("role:     {}", user.role),
        format!("status:   {}", status(user.active)),
    ];
    if let Some(verified) = user.email_verified {
        lines.push(format!("verified: {}", if verified { "yes" } else { "no" }));
    }
    lines.push(format!("created:  {}", day(&user.created_at)));
    join(lines)
}

pub fn session(session: &Session) -> String {
    if session.is_restoring() {
        return "restoring session".to_owned();
    }
    match session.identity() {
        Some(user) => format!("logged in as {} ({})", user.label(), user.role),
        None => "not logged in".to_owned(),
    }
}

pub fn pedidos(pedidos: &[Pedido]) -> String {
    if pedidos.is_empty() {
        return "no orders match the filters\n".to_owned();
    }
    let mut lines = vec![format!(
        "{:>6}  {:<22} {:<6} {:<20} {:<12} ITEMS",
        "ID", "STATE", "PRIO", "CUSTOMER", "REQUESTED"
    )];
    for pedido in pedidos {
        let requested = pedido.fecha_solicitada.as_deref().map_or("-", day);
        lines.push(format!(
            "{:>6}  {:<22} {:<6} {:<20} {:<12} {}",
            pedido.id,
            pedido.estado.label(),
            pedido.prioridad.as_str(),
            pedido.customer(),
            requested,
            truncate(&pedido.resumen_items, ITEMS_WIDTH)
        ));
    }
    lines.push(format!("{} order(s)", pedidos.len()));
    join(lines)
}

pub fn estadisticas(stats: &Estadisticas) -> String {
    let mut lines = vec![format!("total: {}", stats.total_pedidos)];
    lines.extend(
        PedidoEstado::ASSIGNABLE
            .into_iter()
            .map(|estado| format!("  {:<22} {}", estado.label(), stats.count(estado))),
    );
    join(lines)
}

pub fn users(users: &[&Identity], counts: UserCounts) -> String {
    let mut lines = vec![format!("{:>6}  {:<30} {:<24} {:<6} STATUS", "ID", "EMAIL", "NAME", "ROLE")];
    lines.extend(users.iter().map(|user| {
        format!(
            "{:>6}  {:<30} {:<24} {:<6} {}",
            user.id,
            user.email,
            user.display_name.as_deref().unwrap_or("-"),
            user.role.as_str(),
            status(user.active)
        )
    }));
    lines.push(format!("total {}, active {}, inactive {}", counts.total, counts.active, counts.inactive));
    join(lines)
}

pub fn decision(path: &str, decision: &Decision) -> String {
    match decision {
        Decision::Allow => format!("{path}: allow"),
        Decision::RedirectTo(target) => format!("{path}: redirect to {target}"),
    }
}

fn status(active: bool) -> &'static str {
    if active { "active" } else { "inactive" }
}

/// Date part of an ISO 8601 timestamp.
fn day(timestamp: &str) -> &str {
    timestamp.split_once('T').map_or(timestamp, |(date, _)| date)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn join(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
