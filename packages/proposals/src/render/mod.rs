// ABOUTME: Branded PDF rendering for proposals
// ABOUTME: Lays out header, client block, line items, totals, schedule, and paged footers

mod canvas;
mod logo;

use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

use backstage_core::format_clp;
use backstage_pricing::{LineItem, QuoteTotals};

use crate::types::ClientInfo;
use canvas::{
    assemble, text_width, wrap_text, Canvas, Font, Rgb, BLACK, CONTENT_BOTTOM, GREY, LIGHT_GREY,
    MARGIN, PAGE_HEIGHT, PAGE_WIDTH, WHITE,
};
use logo::Logo;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid totals: {0}")]
    InvalidTotals(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Consultancy identity printed on every proposal
#[derive(Debug, Clone)]
pub struct Brand {
    pub nombre: String,
    pub email: Option<String>,
    pub sitio_web: Option<String>,
    /// PNG, JPEG, GIF, or WebP shown in the header when present and readable
    pub avatar_path: Option<PathBuf>,
    pub color: Rgb,
}

impl Default for Brand {
    fn default() -> Self {
        Self {
            nombre: "Backstage".to_string(),
            email: None,
            sitio_web: None,
            avatar_path: None,
            color: (0.11, 0.24, 0.45),
        }
    }
}

/// Everything the renderer needs; borrowed so callers keep ownership of the payload
#[derive(Debug, Clone, Copy)]
pub struct ProposalDocument<'a> {
    pub numero: &'a str,
    pub fecha: NaiveDate,
    pub validez_dias: i64,
    pub cliente: &'a ClientInfo,
    pub totals: &'a QuoteTotals,
    pub notas: Option<&'a str>,
}

const RIGHT: f32 = PAGE_WIDTH - MARGIN;
const HEADER_HEIGHT: f32 = 96.0;
const COL_LIST: f32 = 360.0;
const COL_PCT: f32 = 420.0;
const ROW: f32 = 16.0;

/// Render the proposal PDF. Identical inputs produce identical bytes.
pub fn render_proposal(doc: &ProposalDocument<'_>, brand: &Brand) -> Result<Vec<u8>, RenderError> {
    check_totals(doc.totals)?;

    let logo = load_logo(brand);
    let mut canvas = Canvas::new();

    draw_header(&mut canvas, doc, brand, logo.as_ref().map(|l| (l.width, l.height)));
    draw_client_block(&mut canvas, doc);
    draw_base_system(&mut canvas, &doc.totals.sistema_base, brand);
    draw_items(&mut canvas, "Módulos", &doc.totals.modulos, brand);
    draw_items(&mut canvas, "Servicios", &doc.totals.servicios, brand);
    draw_totals(&mut canvas, doc.totals, brand);
    draw_schedule(&mut canvas, doc.totals, brand);
    draw_notes(&mut canvas, doc);

    let mut pages = canvas.finish();
    let page_count = pages.len();
    for (index, operations) in pages.iter_mut().enumerate() {
        let mut footer = Canvas::new();
        draw_footer(&mut footer, brand, doc.numero, index + 1, page_count);
        operations.extend(footer.finish().into_iter().flatten());
    }

    debug!(numero = doc.numero, pages = page_count, "Rendered proposal");
    let stream = logo.map(|l| l.stream);
    Ok(assemble(pages, stream)?)
}

/// Reject totals that could not have come from the pricing engine
fn check_totals(totals: &QuoteTotals) -> Result<(), RenderError> {
    let lines = std::iter::once(&totals.sistema_base)
        .chain(totals.modulos.iter())
        .chain(totals.servicios.iter());
    for line in lines {
        if line.precio_lista < 0 || line.precio_final < 0 {
            return Err(RenderError::InvalidTotals(format!(
                "negative price on '{}'",
                line.id
            )));
        }
    }

    let amounts = [
        ("subtotal", totals.subtotal),
        ("descuento", totals.descuento),
        ("recargo", totals.recargo),
        ("total", totals.total),
    ];
    if let Some((name, _)) = amounts.iter().find(|(_, value)| *value < 0) {
        return Err(RenderError::InvalidTotals(format!("{} is negative", name)));
    }

    if totals.subtotal - totals.descuento + totals.recargo != totals.total {
        return Err(RenderError::InvalidTotals(
            "total does not equal subtotal - descuento + recargo".to_string(),
        ));
    }

    let scheduled: i64 = totals.plan_pagos.iter().map(|i| i.monto).sum();
    if totals.plan_pagos.is_empty() || scheduled != totals.total {
        return Err(RenderError::InvalidTotals(format!(
            "payment schedule sums to {} but total is {}",
            scheduled, totals.total
        )));
    }
    if totals.plan_pagos.iter().any(|i| i.monto < 0) {
        return Err(RenderError::InvalidTotals(
            "payment schedule has a negative installment".to_string(),
        ));
    }
    Ok(())
}

fn load_logo(brand: &Brand) -> Option<Logo> {
    let path = brand.avatar_path.as_ref()?;
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Avatar {} unavailable, rendering without it: {}", path.display(), e);
            return None;
        }
    };
    match Logo::decode(&bytes) {
        Ok(logo) => Some(logo),
        Err(e) => {
            warn!("Avatar {} is not a usable image, rendering without it: {}", path.display(), e);
            None
        }
    }
}

fn draw_header(
    canvas: &mut Canvas,
    doc: &ProposalDocument<'_>,
    brand: &Brand,
    logo: Option<(u32, u32)>,
) {
    let band_bottom = PAGE_HEIGHT - HEADER_HEIGHT;
    canvas.fill_rect(0.0, band_bottom, PAGE_WIDTH, HEADER_HEIGHT, brand.color);

    let mut text_x = MARGIN;
    if let Some((width, height)) = logo {
        let box_size = 60.0;
        let (w, h) = fit(width, height, box_size);
        let y = band_bottom + (HEADER_HEIGHT - h) / 2.0;
        canvas.image(MARGIN, y, w, h);
        text_x += box_size + 12.0;
    }

    canvas.text(text_x, band_bottom + 52.0, Font::Bold, 20.0, WHITE, &brand.nombre);
    let contact: Vec<&str> = [brand.sitio_web.as_deref(), brand.email.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !contact.is_empty() {
        canvas.text(text_x, band_bottom + 34.0, Font::Regular, 9.0, WHITE, &contact.join("  ·  "));
    }

    canvas.text_right(RIGHT, band_bottom + 58.0, Font::Bold, 16.0, WHITE, "COTIZACIÓN");
    canvas.text_right(RIGHT, band_bottom + 40.0, Font::Regular, 11.0, WHITE, doc.numero);
    canvas.text_right(
        RIGHT,
        band_bottom + 25.0,
        Font::Regular,
        9.0,
        WHITE,
        &format!("Fecha: {}", doc.fecha.format("%d-%m-%Y")),
    );

    canvas.y = band_bottom - 30.0;
}

fn fit(width: u32, height: u32, size: f32) -> (f32, f32) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = size / w.max(h);
    (w * scale, h * scale)
}

fn draw_client_block(canvas: &mut Canvas, doc: &ProposalDocument<'_>) {
    let top = canvas.y;
    canvas.text(MARGIN, top, Font::Regular, 9.0, GREY, "PREPARADA PARA");
    canvas.text(MARGIN, top - 16.0, Font::Bold, 13.0, BLACK, &doc.cliente.nombre);

    let mut y = top - 31.0;
    for value in [&doc.cliente.empresa, &doc.cliente.email, &doc.cliente.telefono]
        .into_iter()
        .flatten()
    {
        canvas.text(MARGIN, y, Font::Regular, 10.0, BLACK, value);
        y -= 13.0;
    }

    let valid_until = doc.fecha + Duration::days(doc.validez_dias);
    let facts = [
        format!("Válida hasta: {}", valid_until.format("%d-%m-%Y")),
        format!("Forma de pago: {}", doc.totals.forma_pago.nombre),
        format!("Plazo estimado: {} semanas", doc.totals.semanas_estimadas),
    ];
    for (i, fact) in facts.iter().enumerate() {
        canvas.text_right(RIGHT, top - 16.0 - 13.0 * i as f32, Font::Regular, 10.0, BLACK, fact);
    }

    canvas.y = y.min(top - 16.0 - 13.0 * facts.len() as f32) - 20.0;
}

fn section_title(canvas: &mut Canvas, title: &str, brand: &Brand) {
    canvas.ensure_space(ROW * 3.0);
    canvas.text(MARGIN, canvas.y, Font::Bold, 12.0, brand.color, title);
    canvas.line(MARGIN, canvas.y - 5.0, RIGHT, canvas.y - 5.0, 0.8, brand.color);
    canvas.y -= ROW + 6.0;
}

fn draw_base_system(canvas: &mut Canvas, base: &LineItem, brand: &Brand) {
    section_title(canvas, "Sistema base", brand);
    canvas.text(MARGIN, canvas.y, Font::Bold, 11.0, BLACK, &base.nombre);
    canvas.text_right(RIGHT, canvas.y, Font::Bold, 11.0, BLACK, &format_clp(base.precio_final));
    canvas.y -= ROW;

    for feature in &base.incluye {
        for (i, line) in wrap_text(feature, Font::Regular, 9.5, RIGHT - MARGIN - 24.0)
            .iter()
            .enumerate()
        {
            canvas.ensure_space(ROW);
            if i == 0 {
                canvas.text(MARGIN + 8.0, canvas.y, Font::Regular, 9.5, GREY, "•");
            }
            canvas.text(MARGIN + 18.0, canvas.y, Font::Regular, 9.5, GREY, line);
            canvas.y -= 13.0;
        }
    }
    canvas.y -= 10.0;
}

fn table_header(canvas: &mut Canvas, columns: &[(&str, f32, bool)]) {
    canvas.fill_rect(MARGIN, canvas.y - 5.0, RIGHT - MARGIN, ROW, LIGHT_GREY);
    for (label, x, right_aligned) in columns {
        if *right_aligned {
            canvas.text_right(*x, canvas.y, Font::Bold, 9.0, BLACK, label);
        } else {
            canvas.text(*x, canvas.y, Font::Bold, 9.0, BLACK, label);
        }
    }
    canvas.y -= ROW + 2.0;
}

fn draw_items(canvas: &mut Canvas, title: &str, items: &[LineItem], brand: &Brand) {
    if items.is_empty() {
        return;
    }
    section_title(canvas, title, brand);
    let columns = [
        ("Ítem", MARGIN + 4.0, false),
        ("Precio lista", COL_LIST, true),
        ("Desc.", COL_PCT, true),
        ("Precio final", RIGHT - 4.0, true),
    ];
    table_header(canvas, &columns);

    for item in items {
        let name_lines = wrap_text(&item_label(item), Font::Regular, 10.0, 230.0);
        if canvas.ensure_space(ROW * name_lines.len() as f32) {
            table_header(canvas, &columns);
        }

        let y = canvas.y;
        for (i, line) in name_lines.iter().enumerate() {
            canvas.text(MARGIN + 4.0, y - 12.0 * i as f32, Font::Regular, 10.0, BLACK, line);
        }
        if item.is_discounted() {
            canvas.text_struck_right(COL_LIST, y, 10.0, GREY, &format_clp(item.precio_lista));
            canvas.text_right(
                COL_PCT,
                y,
                Font::Regular,
                10.0,
                BLACK,
                &format!("{}%", format_percentage(item.descuento_porcentaje)),
            );
        } else {
            canvas.text_right(COL_LIST, y, Font::Regular, 10.0, BLACK, &format_clp(item.precio_lista));
            canvas.text_right(COL_PCT, y, Font::Regular, 10.0, GREY, "-");
        }
        canvas.text_right(RIGHT - 4.0, y, Font::Bold, 10.0, BLACK, &format_clp(item.precio_final));

        canvas.y -= ROW + 12.0 * (name_lines.len() - 1) as f32;
    }
    canvas.y -= 10.0;
}

fn item_label(item: &LineItem) -> String {
    match item.meses {
        Some(meses) if !item.nombre.contains("meses") => format!("{} ({} meses)", item.nombre, meses),
        _ => item.nombre.clone(),
    }
}

fn format_percentage(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value).replace('.', ",")
    }
}

fn draw_totals(canvas: &mut Canvas, totals: &QuoteTotals, brand: &Brand) {
    let mut rows: Vec<(String, String)> = vec![("Subtotal".to_string(), format_clp(totals.subtotal))];
    if totals.descuento > 0 {
        rows.push((
            format!("Descuento ({}%)", format_percentage(totals.descuento_porcentaje)),
            format!("-{}", format_clp(totals.descuento)),
        ));
    }
    if totals.recargo > 0 {
        rows.push((
            format!("Recargo {} ({}%)", totals.forma_pago.nombre, format_percentage(totals.recargo_porcentaje)),
            format!("+{}", format_clp(totals.recargo)),
        ));
    }

    canvas.ensure_space(ROW * (rows.len() as f32 + 3.0));
    let label_right = COL_PCT;
    for (label, value) in &rows {
        canvas.text_right(label_right, canvas.y, Font::Regular, 10.0, BLACK, label);
        canvas.text_right(RIGHT - 4.0, canvas.y, Font::Regular, 10.0, BLACK, value);
        canvas.y -= ROW;
    }

    let band_left = label_right - 120.0;
    canvas.fill_rect(band_left, canvas.y - 7.0, RIGHT - band_left, ROW + 6.0, brand.color);
    canvas.text_right(label_right, canvas.y, Font::Bold, 12.0, WHITE, "Total");
    canvas.text_right(RIGHT - 4.0, canvas.y, Font::Bold, 12.0, WHITE, &format_clp(totals.total));
    canvas.y -= ROW + 20.0;
}

fn draw_schedule(canvas: &mut Canvas, totals: &QuoteTotals, brand: &Brand) {
    section_title(canvas, "Plan de pagos", brand);
    let columns = [
        ("#", MARGIN + 4.0, false),
        ("Cuota", MARGIN + 30.0, false),
        ("%", COL_PCT, true),
        ("Monto", RIGHT - 4.0, true),
    ];
    table_header(canvas, &columns);

    for installment in &totals.plan_pagos {
        if canvas.ensure_space(ROW) {
            table_header(canvas, &columns);
        }
        let y = canvas.y;
        canvas.text(MARGIN + 4.0, y, Font::Regular, 10.0, GREY, &installment.numero.to_string());
        canvas.text(MARGIN + 30.0, y, Font::Regular, 10.0, BLACK, &installment.nombre);
        canvas.text_right(
            COL_PCT,
            y,
            Font::Regular,
            10.0,
            BLACK,
            &format!("{}%", format_percentage(installment.porcentaje)),
        );
        canvas.text_right(RIGHT - 4.0, y, Font::Regular, 10.0, BLACK, &format_clp(installment.monto));
        canvas.y -= ROW;
    }
    canvas.y -= 10.0;

    if let Some(soporte) = &totals.soporte {
        canvas.ensure_space(ROW * 2.0);
        let note = format!(
            "Soporte mensual: {} {}/mes, facturado aparte y no incluido en el total.",
            soporte.nombre,
            format_clp(soporte.precio_mensual)
        );
        for line in wrap_text(&note, Font::Regular, 9.5, RIGHT - MARGIN) {
            canvas.ensure_space(ROW);
            canvas.text(MARGIN, canvas.y, Font::Regular, 9.5, GREY, &line);
            canvas.y -= 13.0;
        }
        canvas.y -= 8.0;
    }
}

fn draw_notes(canvas: &mut Canvas, doc: &ProposalDocument<'_>) {
    let Some(notas) = doc.notas.filter(|n| !n.trim().is_empty()) else {
        return;
    };
    canvas.ensure_space(ROW * 3.0);
    canvas.text(MARGIN, canvas.y, Font::Bold, 10.0, BLACK, "Notas");
    canvas.y -= ROW;
    for paragraph in notas.lines() {
        for line in wrap_text(paragraph, Font::Regular, 9.5, RIGHT - MARGIN) {
            canvas.ensure_space(ROW);
            canvas.text(MARGIN, canvas.y, Font::Regular, 9.5, BLACK, &line);
            canvas.y -= 13.0;
        }
    }
}

fn draw_footer(canvas: &mut Canvas, brand: &Brand, numero: &str, page: usize, pages: usize) {
    let y = CONTENT_BOTTOM - 40.0;
    canvas.line(MARGIN, y + 14.0, RIGHT, y + 14.0, 0.5, LIGHT_GREY);

    let left = match &brand.email {
        Some(email) => format!("{} · {} · {}", brand.nombre, email, numero),
        None => format!("{} · {}", brand.nombre, numero),
    };
    canvas.text(MARGIN, y, Font::Regular, 8.0, GREY, &left);

    let label = format!("Página {} de {}", page, pages);
    let x = RIGHT - text_width(&label, Font::Regular, 8.0);
    canvas.text(x, y, Font::Regular, 8.0, GREY, &label);
}
