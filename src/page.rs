use serde::Serialize;

use crate::error::Result;
use crate::model::{Entity, Relation};
use crate::svg::escape_xml;
use crate::theme::{Theme, ThemeColor, ThemeKind};

const STYLE_CSS: &str = include_str!("../assets/style.css");
const APP_JS: &str = include_str!("../assets/app.js");

/// Attribute filter structure: keys and their distinct values, both in
/// first-seen order across the entity list.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterModel {
    pub keys: Vec<FilterKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterKey {
    pub key: String,
    pub values: Vec<String>,
}

impl FilterModel {
    pub fn from_entities(entities: &[Entity]) -> Self {
        let mut keys: Vec<FilterKey> = Vec::new();
        for entity in entities {
            let Some(attr) = &entity.attr else { continue };
            for (key, value) in attr {
                let slot = match keys.iter_mut().find(|f| f.key == *key) {
                    Some(slot) => slot,
                    None => {
                        keys.push(FilterKey {
                            key: key.clone(),
                            values: Vec::new(),
                        });
                        keys.last_mut().expect("just pushed")
                    }
                };
                if !slot.values.contains(value) {
                    slot.values.push(value.clone());
                }
            }
        }
        FilterModel { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// What goes over the wire to the page script, embedded exactly once.
#[derive(Serialize)]
struct ClientData<'a> {
    text: &'a str,
    entities: &'a [Entity],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    relations: &'a [Relation],
    theme: &'a str,
    light_theme_colors: &'a [ThemeColor],
    dark_theme_colors: &'a [ThemeColor],
}

/// Serializes the client payload so it can sit inside a `<script>` element:
/// `<` is emitted as a JSON unicode escape, which keeps `</script>` inert.
fn embed_json(data: &ClientData) -> Result<String> {
    Ok(serde_json::to_string(data)?.replace('<', "\\u003c"))
}

fn filter_panel_html(filters: &FilterModel) -> String {
    let mut html = String::from(
        r#"<div id="filters-panel" class="side-panel"><div class="panel-body"><h2>Filters</h2>"#,
    );

    if filters.is_empty() {
        html.push_str("<p class=\"panel-empty\">No entity attributes to filter on.</p>");
    } else {
        html.push_str(concat!(
            r#"<div class="logic-toggle"><label>Logic between attribute keys"#,
            r#"<span class="toggle-group"><span>OR</span>"#,
            r#"<input type="checkbox" id="filter-logic-toggle">"#,
            r#"<span>AND</span></span></label></div>"#,
        ));

        for filter in &filters.keys {
            let key = escape_xml(&filter.key);
            html.push_str(&format!(
                r#"<div class="filter-section"><label><input type="checkbox" class="filter-key" data-filter-key="{key}" checked> <strong>{key}</strong></label><div class="filter-values">"#,
            ));
            for value in &filter.values {
                let value = escape_xml(value);
                html.push_str(&format!(
                    r#"<label><input type="checkbox" class="filter-value" data-filter-key="{key}" data-filter-value="{value}" checked> {value}</label>"#,
                ));
            }
            html.push_str("</div></div>");
        }
    }

    html.push_str("</div></div>");
    html
}

fn table_panel_html(text: &str, entities: &[Entity], relations: &[Relation]) -> String {
    let mut attr_keys: Vec<&str> = entities
        .iter()
        .filter_map(|e| e.attr.as_ref())
        .flat_map(|attr| attr.keys().map(String::as_str))
        .collect();
    attr_keys.sort_unstable();
    attr_keys.dedup();

    let mut html = String::from(
        r#"<div id="table-panel" class="side-panel"><div class="panel-body"><div class="table-section"><h2>Entities</h2><table><thead><tr><th>ID</th><th>Text</th>"#,
    );
    for key in &attr_keys {
        html.push_str(&format!("<th>{}</th>", escape_xml(key)));
    }
    html.push_str("</tr></thead><tbody>");

    for entity in entities {
        let chip_style = entity
            .color
            .as_deref()
            .map(|c| format!(r#" style="background-color: {}""#, escape_xml(c)))
            .unwrap_or_default();
        html.push_str(&format!(
            r#"<tr data-entity-id="{}"><td>{}</td><td><mark{}>{}</mark></td>"#,
            escape_xml(&entity.entity_id),
            escape_xml(&entity.entity_id),
            chip_style,
            escape_xml(&entity.slice(text)),
        ));
        for key in &attr_keys {
            let value = entity
                .attr
                .as_ref()
                .and_then(|attr| attr.get(*key))
                .map(String::as_str)
                .unwrap_or("");
            html.push_str(&format!("<td>{}</td>", escape_xml(value)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");

    if !relations.is_empty() {
        html.push_str(
            r#"<div class="table-section"><h2>Relations</h2><table><thead><tr><th>Entity 1</th><th>Entity 2</th></tr></thead><tbody>"#,
        );
        for (index, relation) in relations.iter().enumerate() {
            let slice_of = |id: &str| {
                entities
                    .iter()
                    .find(|e| e.entity_id == id)
                    .map(|e| e.slice(text))
                    .unwrap_or_default()
            };
            html.push_str(&format!(
                r#"<tr data-relation-index="{index}"><td>{}: {}</td><td>{}: {}</td></tr>"#,
                escape_xml(&relation.entity_1_id),
                escape_xml(&slice_of(&relation.entity_1_id)),
                escape_xml(&relation.entity_2_id),
                escape_xml(&slice_of(&relation.entity_2_id)),
            ));
        }
        html.push_str("</tbody></table></div>");
    }

    html.push_str("</div></div>");
    html
}

const FILTER_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" width="16" height="16"><polygon points="22 3 2 3 10 12.46 10 19 14 21 14 12.46 22 3"></polygon></svg>"#;
const TABLE_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" width="16" height="16"><rect x="3" y="3" width="18" height="18" rx="2"></rect><line x1="3" y1="9" x2="21" y2="9"></line><line x1="9" y1="3" x2="9" y2="21"></line></svg>"#;

/// Wraps the rendered canvas into a fully self-contained page: styles, the
/// data object, filter and table panels, and the interaction script.
pub fn render_page(
    text: &str,
    entities: &[Entity],
    relations: &[Relation],
    canvas_svg: &str,
    theme_kind: ThemeKind,
    title: &str,
) -> Result<String> {
    let theme = theme_kind.theme();
    let light_theme_colors = ThemeKind::Light.palette()?;
    let dark_theme_colors = ThemeKind::Dark.palette()?;

    let data_json = embed_json(&ClientData {
        text,
        entities,
        relations,
        theme: theme_kind.as_str(),
        light_theme_colors: &light_theme_colors,
        dark_theme_colors: &dark_theme_colors,
    })?;

    let filters = FilterModel::from_entities(entities);
    let body_class = match theme_kind {
        ThemeKind::Light => "",
        ThemeKind::Dark => " class=\"dark-theme\"",
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{vars}
{css}
</style>
</head>
<body{body_class}>
<div class="header-container">
<h1>{title}</h1>
<div class="header-buttons">
<button id="filters-button" title="Filters">{filter_icon}</button>
<button id="table-button" title="Tables">{table_icon}</button>
</div>
</div>
<div id="display-container">
{canvas}
</div>
{filter_panel}
{table_panel}
<div id="panel-overlay"></div>
<div id="tooltip" hidden></div>
<script>
const data = {data};
{js}
</script>
</body>
</html>
"#,
        title = escape_xml(title),
        vars = theme_vars(&theme),
        css = STYLE_CSS,
        body_class = body_class,
        filter_icon = FILTER_ICON,
        table_icon = TABLE_ICON,
        canvas = canvas_svg,
        filter_panel = filter_panel_html(&filters),
        table_panel = table_panel_html(text, entities, relations),
        data = data_json,
        js = APP_JS,
    ))
}

fn theme_vars(theme: &Theme) -> String {
    format!(
        ":root {{\n  --background: {};\n  --text: {};\n  --surface: {};\n  --border: {};\n}}",
        theme.background_color, theme.text_color, theme.surface_color, theme.border_color,
    )
}
