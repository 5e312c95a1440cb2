//! Render functions for the polled page sections

use super::{Element, ViewNode};
use crate::client::{RankedUser, Report, UserSnapshot};
use crate::theme::Theme;

/// Shown when a report has no photo
pub const PLACEHOLDER_PHOTO: &str = "https://via.placeholder.com/300x200.png?text=Sin+Imagen";

const NO_REPORTS_MESSAGE: &str = "No hay reportes pendientes por recoger.";

fn first_name(full_name: &str) -> &str {
    full_name.split(' ').next().unwrap_or_default()
}

/// Fixed-point formatting that rounds exact ties away from zero, matching
/// the web page's `Number.toFixed`. `format!` alone rounds ties to even.
pub fn to_fixed(value: f64, digits: usize) -> String {
    // An exact tie at `digits` is an odd multiple of 2^-(digits + 1)
    let scaled = value * 2f64.powi(digits as i32 + 1);
    let tie = scaled.is_finite() && scaled.fract() == 0.0 && scaled % 2.0 != 0.0;
    let value = if tie {
        // One ULP away from zero breaks the tie upward in magnitude
        f64::from_bits(value.to_bits() + 1)
    } else {
        value
    };
    format!("{:.*}", digits, value)
}

fn stat(label: &str, class: &str, value: String) -> Element {
    Element::new("div")
        .class("stat")
        .child(Element::new("span").class("stat-label").text(label))
        .child(Element::new("span").class(class).text(value))
}

/// Greeting and the user's own totals
pub fn render_user_stats(snapshot: &UserSnapshot) -> ViewNode {
    Element::new("section")
        .class("user-stats")
        .child(
            Element::new("h2")
                .class("user-name")
                .text(format!("{}!", first_name(&snapshot.nombre))),
        )
        .child(stat("Reciclado", "kg-total", format!("{} kg", to_fixed(snapshot.kg_reciclados, 2))))
        .child(stat("Minutos", "minutos-total", snapshot.minutos.to_string()))
        .child(stat("Árboles salvados", "arboles-total", snapshot.arboles.to_string()))
        .child(stat(
            "CO₂ evitado",
            "co2-evitado",
            format!("{} kg de CO₂", to_fixed(snapshot.co2_evitado, 1)),
        ))
        .into()
}

/// Leaderboard, position first, first names only
pub fn render_ranking(top_users: &[RankedUser]) -> ViewNode {
    let items = top_users.iter().enumerate().map(|(index, user)| {
        let position = index + 1;
        Element::new("div")
            .class("list-group-item ranking-item")
            .child(Element::new("div").class("ranking-badge").text(position.to_string()))
            .child(
                Element::new("div")
                    .text(first_name(&user.nombre))
                    .child(
                        Element::new("strong")
                            .class(&format!("kg-top kg-{}", position))
                            .text(format!("{} kg", to_fixed(user.kg_reciclados, 1))),
                    ),
            )
    });

    Element::new("div")
        .class("list-group ranking-list")
        .attr("id", "ranking-list")
        .children(items)
        .into()
}

fn report_card(report: &Report) -> Element {
    let photo = report
        .foto_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .unwrap_or(PLACEHOLDER_PHOTO);

    let field = |label: &str, class: &str, value: String| {
        Element::new("p")
            .child(Element::new("span").class("field-label").text(label))
            .child(Element::new("span").class(class).text(value))
    };

    Element::new("div")
        .class("col-md-6 reporte-card")
        .attr("data-id", report.id.to_string())
        .child(
            Element::new("img")
                .class("reporte-imagen")
                .attr("src", photo)
                .attr("alt", "Foto del reciclaje"),
        )
        .child(field("Kg:", "reporte-kg", report.kg_reportados.to_string()))
        .child(field(
            "Ubicación:",
            "reporte-ubicacion",
            report.ubicacion_desc.clone().unwrap_or_default(),
        ))
        .child(field("Reportado por:", "reporte-usuario", report.usuarios.nombre.clone()))
        .child(field(
            "Barrio:",
            "reporte-barrio",
            report.usuarios.barrio.clone().unwrap_or_default(),
        ))
        .child(
            Element::new("button")
                .class("btn-recoger")
                .attr("data-id", report.id.to_string())
                .text("Marcar como Recogido"),
        )
}

/// Pending pickups with their count; the "no reports" message is visible
/// only for an empty list.
pub fn render_report_list(reports: &[Report]) -> ViewNode {
    let mut empty_message = Element::new("p")
        .class("no-reportes")
        .attr("id", "no-reportes")
        .text(NO_REPORTS_MESSAGE);
    if !reports.is_empty() {
        empty_message = empty_message.attr("hidden", "");
    }

    Element::new("section")
        .class("worklist")
        .child(
            Element::new("h2")
                .text("Reportes pendientes: ")
                .child(
                    Element::new("span")
                        .class("contador-reportes")
                        .attr("id", "contadorReportes")
                        .text(reports.len().to_string()),
                ),
        )
        .child(empty_message)
        .child(
            Element::new("div")
                .class("row lista-reportes")
                .attr("id", "lista-reportes")
                .children(reports.iter().map(report_card)),
        )
        .into()
}

/// Theme toggle button: sun icon in light mode, moon icon in dark mode
pub fn render_theme_toggle(theme: Theme) -> ViewNode {
    Element::new("button")
        .attr("id", "themeToggle")
        .attr("data-theme", theme.as_str())
        .child(Element::new("i").class(&format!("bi {}", theme.icon_class())))
        .into()
}
