use crate::config::AppConfig;
use crate::types::{PharmacyRecord, Selection};
use geo::{BoundingRect, Centroid, MultiPoint, Point};
use serde::Serialize;
use std::fmt::Write;
use tracing::error;

pub const NO_SELECTION_PROMPT: &str = "약품목을 선택하면 해당 약국을 보여드려요.";
pub const NO_LOCATION_NOTICE: &str = "선택한 약국에 위치 정보가 없어 지도를 표시할 수 없어요.";

const TABLE_HEADERS: [&str; 4] = ["병원명", "주소", "전화번호", "수거약품목"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
    pub popup: String,
}

/// Leaflet-ready view of the coordinate-bearing part of a result set.
/// Coordinate pairs are `[lat, lon]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: [f64; 2],
    pub bounds: [[f64; 2]; 2],
    pub markers: Vec<Marker>,
}

/// Everything a single render pass needs.
pub struct PageState<'a> {
    pub config: &'a AppConfig,
    pub categories: &'a [String],
    pub selection: &'a Selection,
    pub matches: &'a [PharmacyRecord],
}

/// Builds the map for `records`, or `None` when none of them carry both coordinates.
pub fn map_view(records: &[PharmacyRecord]) -> Option<MapView> {
    let located: Vec<(&PharmacyRecord, Point<f64>)> = records
        .iter()
        .filter_map(|r| r.location().map(|p| (r, p)))
        .collect();
    if located.is_empty() {
        return None;
    }

    let points: MultiPoint<f64> = located.iter().map(|(_, p)| *p).collect();
    // Centroid of a multipoint is the mean of its points
    let center = points.centroid()?;
    let rect = points.bounding_rect()?;

    let markers = located
        .iter()
        .map(|(record, point)| Marker {
            lat: point.y(),
            lon: point.x(),
            label: record.name.clone(),
            popup: format!("{}\n{}", record.name, record.items_text()),
        })
        .collect();

    Some(MapView {
        center: [center.y(), center.x()],
        bounds: [[rect.min().y, rect.min().x], [rect.max().y, rect.max().x]],
        markers,
    })
}

/// Banner text for a non-empty selection, e.g. `선택한 약품목: ['진통제'] → 약국 2곳`.
pub fn selection_banner(selection: &Selection, match_count: usize) -> String {
    let quoted: Vec<String> = selection.categories.iter().map(|c| format!("'{}'", c)).collect();
    format!("선택한 약품목: [{}] → 약국 {}곳", quoted.join(", "), match_count)
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// HTML table of name, address, phone and collected items, in result order.
pub fn render_table(records: &[PharmacyRecord]) -> String {
    let mut html = String::from("<table class=\"results\">\n<thead><tr>");
    for header in TABLE_HEADERS {
        let _ = write!(html, "<th>{}</th>", header);
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for record in records {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&record.name),
            escape_html(&record.address),
            escape_html(&record.phone),
            escape_html(record.items_text()),
        );
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

/// Tab-separated table for terminal output.
pub fn render_table_text(records: &[PharmacyRecord]) -> String {
    let mut out = TABLE_HEADERS.join("\t");
    out.push('\n');
    for record in records {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            record.name,
            record.address,
            record.phone,
            record.items_text()
        );
    }
    out
}

/// Map container plus the Leaflet script, or the no-location notice.
pub fn render_map(config: &AppConfig, records: &[PharmacyRecord]) -> String {
    let view = match map_view(records) {
        Some(view) => view,
        None => return format!("<div class=\"info\">{}</div>\n", NO_LOCATION_NOTICE),
    };

    #[derive(Serialize)]
    struct MapScript<'a> {
        view: &'a MapView,
        zoom: u8,
        tile_url: &'a str,
        attribution: &'a str,
    }

    let payload = MapScript {
        view: &view,
        zoom: config.map.zoom,
        tile_url: &config.map.tile_url,
        attribution: &config.map.attribution,
    };
    // serde_json output is not escaped for a <script> context
    let json = match serde_json::to_string(&payload) {
        Ok(json) => json.replace("</", "<\\/"),
        Err(e) => {
            error!("Failed to serialize map view: {}", e);
            return format!("<div class=\"info\">{}</div>\n", NO_LOCATION_NOTICE);
        }
    };

    format!(
        r#"<div id="map"></div>
<script>
(function () {{
  const cfg = {json};
  const map = L.map('map').setView(cfg.view.center, cfg.zoom);
  L.tileLayer(cfg.tile_url, {{ attribution: cfg.attribution }}).addTo(map);
  cfg.view.markers.forEach(function (m) {{
    const lines = m.popup.split('\n');
    const popup = document.createElement('div');
    const title = document.createElement('b');
    title.textContent = lines[0];
    popup.appendChild(title);
    popup.appendChild(document.createElement('br'));
    popup.appendChild(document.createTextNode(lines.slice(1).join(' ')));
    L.marker([m.lat, m.lon]).bindTooltip(m.label).bindPopup(popup).addTo(map);
  }});
  map.fitBounds(cfg.view.bounds);
}})();
</script>
"#
    )
}

fn render_checkboxes(state: &PageState) -> String {
    let columns = state.config.selection.grid_columns.max(1);
    let mut html = format!(
        "<form method=\"get\" action=\"/\" class=\"categories\" style=\"grid-template-columns: repeat({}, 1fr)\">\n",
        columns
    );
    for category in state.categories {
        let checked = if state.selection.categories.contains(category) { " checked" } else { "" };
        let value = escape_html(category);
        let _ = writeln!(
            html,
            "<label><input type=\"checkbox\" name=\"category\" value=\"{}\" onchange=\"this.form.submit()\"{}> {}</label>",
            value, checked, value
        );
    }
    html.push_str("</form>\n");
    html
}

/// One full render pass: the page for the current selection.
pub fn render_page(state: &PageState) -> String {
    let config = state.config;
    let mut body = String::new();

    let _ = writeln!(body, "<h1>{}</h1>", escape_html(&config.page.title));
    let _ = writeln!(body, "<p>{}</p>", escape_html(&config.page.description));
    let _ = writeln!(
        body,
        "<h2>♻수거 약품목 선택 (최대 {}개)</h2>",
        config.selection.max_selected
    );
    body.push_str(&render_checkboxes(state));

    if let Some(warning) = &state.selection.warning {
        let _ = writeln!(body, "<div class=\"error\">{}</div>", escape_html(warning));
    }

    if state.selection.is_empty() {
        let _ = writeln!(body, "<div class=\"info\">{}</div>", NO_SELECTION_PROMPT);
    } else {
        let banner = selection_banner(state.selection, state.matches.len());
        let _ = writeln!(body, "<div class=\"success\">{}</div>", escape_html(&banner));
        body.push_str(&render_table(state.matches));
        body.push_str(&render_map(config, state.matches));
    }

    format!(
        r#"<!doctype html>
<html lang="ko">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{title}</title>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"></script>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; }}
    .categories {{ display: grid; gap: 0.25rem 1rem; margin-bottom: 1rem; }}
    .success, .error, .info {{ padding: 0.75rem 1rem; border-radius: 0.5rem; margin: 0.75rem 0; }}
    .success {{ background: #e8f5e9; color: #1b5e20; }}
    .error {{ background: #ffebee; color: #b71c1c; }}
    .info {{ background: #e3f2fd; color: #0d47a1; }}
    table.results {{ border-collapse: collapse; width: 100%; }}
    table.results th, table.results td {{ border: 1px solid #ddd; padding: 0.4rem; text-align: left; }}
    #map {{ height: 480px; margin-top: 1rem; }}
  </style>
</head>
<body>
{body}</body>
</html>
"#,
        title = escape_html(&config.page.title),
        body = body,
    )
}
