//! Style records and the `key=value;` style-string codec.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered `key=value;` style-string as used by mxGraph cells.
///
/// Values are escaped on output (`%` → `%25`, `;` → `%3B`, `=` → `%3D`) so that font names,
/// URLs and tooltips containing delimiter characters survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleString {
    named: Option<String>,
    entries: IndexMap<String, String>,
}

impl StyleString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw style attribute. Later duplicate keys win; the first segment without `=` is
    /// kept as the named style (draw.io writes e.g. `ellipse;whiteSpace=wrap;`).
    pub fn parse(raw: &str) -> Self {
        let mut out = Self::new();
        for segment in raw.split(';') {
            if segment.trim().is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    if key.is_empty() {
                        continue;
                    }
                    out.entries.insert(key.to_string(), unescape_value(value));
                }
                None => {
                    if out.named.is_none() {
                        out.named = Some(unescape_value(segment.trim()));
                    }
                }
            }
        }
        out
    }

    pub fn named(&self) -> Option<&str> {
        self.named.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        parse_flag(self.get(key)?)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        parse_int(self.get(key)?)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_none() && self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for StyleString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(named) = &self.named {
            write!(f, "{};", escape_value(named))?;
        }
        for (key, value) in &self.entries {
            write!(f, "{key}={};", escape_value(value))?;
        }
        Ok(())
    }
}

fn escape_value(raw: &str) -> std::borrow::Cow<'_, str> {
    if !raw.contains(['%', ';', '=']) {
        return std::borrow::Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ';' => out.push_str("%3B"),
            '=' => out.push_str("%3D"),
            _ => out.push(ch),
        }
    }
    std::borrow::Cow::Owned(out)
}

fn unescape_value(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = match (bytes[i + 1], bytes[i + 2].to_ascii_uppercase()) {
                (b'2', b'5') => Some('%'),
                (b'3', b'B') => Some(';'),
                (b'3', b'D') => Some('='),
                _ => None,
            };
            if let Some(ch) = decoded {
                out.push_str(&raw[start..i]);
                out.push(ch);
                i += 3;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&raw[start..]);
    out
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" => Some(true),
        "0" => Some(false),
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    // draw.io writes fractional values after interactive edits (e.g. `x="120.5"`).
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
}

pub(crate) fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

pub(crate) fn attr_flag(value: Option<&str>) -> Option<bool> {
    parse_flag(value?)
}

pub(crate) fn attr_int(value: Option<&str>) -> Option<i64> {
    parse_int(value?)
}

/// Text weight/slant. Serialized in style-strings with draw.io's bit flags (bold = 1,
/// italic = 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn bits(self) -> i64 {
        match self {
            FontStyle::Normal => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
            FontStyle::BoldItalic => 3,
        }
    }

    pub fn from_bits(bits: i64) -> Self {
        match (bits & 1 != 0, bits & 2 != 0) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" => TextAlign::Left,
            "right" => TextAlign::Right,
            _ => TextAlign::Center,
        }
    }
}

/// Canvas-level styling carried by the `mxGraphModel` container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentStyle {
    pub theme: String,
    pub background: String,
    pub grid: bool,
    pub grid_size: i64,
    pub grid_color: String,
    pub connect: bool,
    pub guides: bool,
    pub page_width: i64,
    pub page_height: i64,
    pub default_font_size: i64,
    pub default_font_family: String,
    pub line_color: String,
    pub fill_color: String,
    pub stroke_width: i64,
    pub shadow: bool,
    pub shadow_color: String,
    pub shadow_opacity: f64,
    pub shadow_offset_x: i64,
    pub shadow_offset_y: i64,
    pub zoom: f64,
    pub math_enabled: bool,
    pub sketch_style: bool,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            background: "#ffffff".to_string(),
            grid: true,
            grid_size: 10,
            grid_color: "#d0d0d0".to_string(),
            connect: true,
            guides: true,
            page_width: 850,
            page_height: 1100,
            default_font_size: 12,
            default_font_family: "Helvetica".to_string(),
            line_color: "#000000".to_string(),
            fill_color: "#ffffff".to_string(),
            stroke_width: 2,
            shadow: true,
            shadow_color: "#808080".to_string(),
            shadow_opacity: 0.25,
            shadow_offset_x: 2,
            shadow_offset_y: 2,
            zoom: 1.0,
            math_enabled: false,
            sketch_style: false,
        }
    }
}

impl DocumentStyle {
    /// `mxGraphModel` attributes in emission order. Fields without a native attribute are
    /// folded into a trailing `style` attribute holding only non-default values.
    pub(crate) fn graph_model_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![
            ("dx", "1186".to_string()),
            ("dy", "764".to_string()),
            ("grid", flag(self.grid).to_string()),
            ("gridSize", self.grid_size.to_string()),
            ("guides", flag(self.guides).to_string()),
            ("tooltips", "1".to_string()),
            ("connect", flag(self.connect).to_string()),
            ("arrows", "1".to_string()),
            ("fold", "1".to_string()),
            ("page", "1".to_string()),
            ("pageScale", "1".to_string()),
            ("pageWidth", self.page_width.to_string()),
            ("pageHeight", self.page_height.to_string()),
            ("background", self.background.clone()),
            ("math", flag(self.math_enabled).to_string()),
            ("shadow", flag(self.shadow).to_string()),
        ];
        let extra = self.extra_style();
        if !extra.is_empty() {
            attrs.push(("style", extra.to_string()));
        }
        attrs
    }

    fn extra_style(&self) -> StyleString {
        let d = Self::default();
        let mut s = StyleString::new();
        if self.theme != d.theme {
            s.insert("theme", self.theme.clone());
        }
        if self.grid_color != d.grid_color {
            s.insert("gridColor", self.grid_color.clone());
        }
        if self.default_font_size != d.default_font_size {
            s.insert("fontSize", self.default_font_size.to_string());
        }
        if self.default_font_family != d.default_font_family {
            s.insert("fontFamily", self.default_font_family.clone());
        }
        if self.line_color != d.line_color {
            s.insert("lineColor", self.line_color.clone());
        }
        if self.fill_color != d.fill_color {
            s.insert("fillColor", self.fill_color.clone());
        }
        if self.stroke_width != d.stroke_width {
            s.insert("strokeWidth", self.stroke_width.to_string());
        }
        if self.shadow_color != d.shadow_color {
            s.insert("shadowColor", self.shadow_color.clone());
        }
        if self.shadow_opacity != d.shadow_opacity {
            s.insert("shadowOpacity", self.shadow_opacity.to_string());
        }
        if self.shadow_offset_x != d.shadow_offset_x {
            s.insert("shadowOffsetX", self.shadow_offset_x.to_string());
        }
        if self.shadow_offset_y != d.shadow_offset_y {
            s.insert("shadowOffsetY", self.shadow_offset_y.to_string());
        }
        if self.zoom != d.zoom {
            s.insert("zoom", self.zoom.to_string());
        }
        if self.sketch_style != d.sketch_style {
            s.insert("sketch", flag(self.sketch_style));
        }
        s
    }

    /// Rebuilds a document style from `mxGraphModel` attributes; every missing or unreadable
    /// attribute keeps its default.
    pub(crate) fn from_graph_model<'a>(attr: impl Fn(&str) -> Option<&'a str>) -> Self {
        let mut out = Self::default();
        if let Some(v) = attr_flag(attr("grid")) {
            out.grid = v;
        }
        if let Some(v) = attr_int(attr("gridSize")) {
            out.grid_size = v;
        }
        if let Some(v) = attr_flag(attr("guides")) {
            out.guides = v;
        }
        if let Some(v) = attr_flag(attr("connect")) {
            out.connect = v;
        }
        if let Some(v) = attr_int(attr("pageWidth")) {
            out.page_width = v;
        }
        if let Some(v) = attr_int(attr("pageHeight")) {
            out.page_height = v;
        }
        if let Some(v) = attr("background") {
            out.background = v.to_string();
        }
        if let Some(v) = attr_flag(attr("math")) {
            out.math_enabled = v;
        }
        if let Some(v) = attr_flag(attr("shadow")) {
            out.shadow = v;
        }

        let extra = StyleString::parse(attr("style").unwrap_or_default());
        if let Some(v) = extra.get("theme") {
            out.theme = v.to_string();
        }
        if let Some(v) = extra.get("gridColor") {
            out.grid_color = v.to_string();
        }
        if let Some(v) = extra.get_i64("fontSize") {
            out.default_font_size = v;
        }
        if let Some(v) = extra.get("fontFamily") {
            out.default_font_family = v.to_string();
        }
        if let Some(v) = extra.get("lineColor") {
            out.line_color = v.to_string();
        }
        if let Some(v) = extra.get("fillColor") {
            out.fill_color = v.to_string();
        }
        if let Some(v) = extra.get_i64("strokeWidth") {
            out.stroke_width = v;
        }
        if let Some(v) = extra.get("shadowColor") {
            out.shadow_color = v.to_string();
        }
        if let Some(v) = extra.get_f64("shadowOpacity") {
            out.shadow_opacity = v;
        }
        if let Some(v) = extra.get_i64("shadowOffsetX") {
            out.shadow_offset_x = v;
        }
        if let Some(v) = extra.get_i64("shadowOffsetY") {
            out.shadow_offset_y = v;
        }
        if let Some(v) = extra.get_f64("zoom") {
            out.zoom = v;
        }
        if let Some(v) = extra.get_bool("sketch") {
            out.sketch_style = v;
        }
        out
    }
}

/// Per-element (and per-connector) styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub gradient: bool,
    pub gradient_color: String,
    pub gradient_direction: String,
    pub stroke_color: String,
    pub stroke_width: i64,
    pub stroke_opacity: f64,
    pub opacity: f64,
    pub font_size: i64,
    pub font_family: String,
    pub font_color: String,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    pub text_opacity: f64,
    pub shadow: bool,
    pub shadow_color: String,
    pub shadow_opacity: f64,
    pub shadow_offset_x: i64,
    pub shadow_offset_y: i64,
    pub dashed: bool,
    pub dash_pattern: String,
    pub rounded: bool,
    pub rounded_radius: i64,
    pub glass: bool,
    pub rotation: i64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub aspect_lock: bool,
    pub auto_size: bool,
    pub resizable: bool,
    pub connectable: bool,
    pub placeholder: String,
    pub tooltip: String,
    pub link: String,
    pub image_align: String,
    pub image_vertical_align: String,
    pub spacing_top: i64,
    pub spacing_right: i64,
    pub spacing_bottom: i64,
    pub spacing_left: i64,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            fill_color: "#ffffff".to_string(),
            fill_opacity: 1.0,
            gradient: false,
            gradient_color: String::new(),
            gradient_direction: "north".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width: 2,
            stroke_opacity: 1.0,
            opacity: 1.0,
            font_size: 12,
            font_family: "Helvetica".to_string(),
            font_color: "#000000".to_string(),
            font_style: FontStyle::Normal,
            text_align: TextAlign::Center,
            text_opacity: 1.0,
            shadow: true,
            shadow_color: "#808080".to_string(),
            shadow_opacity: 0.25,
            shadow_offset_x: 2,
            shadow_offset_y: 2,
            dashed: false,
            dash_pattern: "3 3".to_string(),
            rounded: false,
            rounded_radius: 10,
            glass: false,
            rotation: 0,
            flip_horizontal: false,
            flip_vertical: false,
            aspect_lock: true,
            auto_size: false,
            resizable: true,
            connectable: true,
            placeholder: String::new(),
            tooltip: String::new(),
            link: String::new(),
            image_align: "center".to_string(),
            image_vertical_align: "middle".to_string(),
            spacing_top: 0,
            spacing_right: 0,
            spacing_bottom: 0,
            spacing_left: 0,
        }
    }
}

impl ElementStyle {
    /// Appends this style's keys: the always-present core keys first, then every field that
    /// differs from its default, in declaration order.
    pub fn write_into(&self, out: &mut StyleString) {
        let d = Self::default();

        out.insert("fillColor", self.fill_color.clone());
        out.insert("strokeColor", self.stroke_color.clone());
        out.insert("strokeWidth", self.stroke_width.to_string());
        out.insert("fontSize", self.font_size.to_string());
        out.insert("fontFamily", self.font_family.clone());
        out.insert("fontColor", self.font_color.clone());
        out.insert("opacity", self.opacity.to_string());

        if self.fill_opacity != d.fill_opacity {
            out.insert("fillOpacity", self.fill_opacity.to_string());
        }
        if self.gradient != d.gradient {
            out.insert("gradient", flag(self.gradient));
        }
        if self.gradient_color != d.gradient_color {
            out.insert("gradientColor", self.gradient_color.clone());
        }
        if self.gradient_direction != d.gradient_direction {
            out.insert("gradientDirection", self.gradient_direction.clone());
        }
        if self.stroke_opacity != d.stroke_opacity {
            out.insert("strokeOpacity", self.stroke_opacity.to_string());
        }
        if self.font_style != d.font_style {
            out.insert("fontStyle", self.font_style.bits().to_string());
        }
        if self.text_align != d.text_align {
            out.insert("align", self.text_align.as_str());
        }
        if self.text_opacity != d.text_opacity {
            out.insert("textOpacity", self.text_opacity.to_string());
        }
        if self.shadow != d.shadow {
            out.insert("shadow", flag(self.shadow));
        }
        if self.shadow_color != d.shadow_color {
            out.insert("shadowColor", self.shadow_color.clone());
        }
        if self.shadow_opacity != d.shadow_opacity {
            out.insert("shadowOpacity", self.shadow_opacity.to_string());
        }
        if self.shadow_offset_x != d.shadow_offset_x {
            out.insert("shadowOffsetX", self.shadow_offset_x.to_string());
        }
        if self.shadow_offset_y != d.shadow_offset_y {
            out.insert("shadowOffsetY", self.shadow_offset_y.to_string());
        }
        if self.dashed != d.dashed {
            out.insert("dashed", flag(self.dashed));
        }
        if self.dash_pattern != d.dash_pattern {
            out.insert("dashPattern", self.dash_pattern.clone());
        }
        if self.rounded != d.rounded {
            out.insert("rounded", flag(self.rounded));
        }
        if self.rounded_radius != d.rounded_radius {
            out.insert("arcSize", self.rounded_radius.to_string());
        }
        if self.glass != d.glass {
            out.insert("glass", flag(self.glass));
        }
        if self.rotation != d.rotation {
            out.insert("rotation", self.rotation.to_string());
        }
        if self.flip_horizontal != d.flip_horizontal {
            out.insert("flipH", flag(self.flip_horizontal));
        }
        if self.flip_vertical != d.flip_vertical {
            out.insert("flipV", flag(self.flip_vertical));
        }
        if self.aspect_lock != d.aspect_lock {
            out.insert(
                "aspect",
                if self.aspect_lock { "fixed" } else { "variable" },
            );
        }
        if self.auto_size != d.auto_size {
            out.insert("autosize", flag(self.auto_size));
        }
        if self.resizable != d.resizable {
            out.insert("resizable", flag(self.resizable));
        }
        if self.connectable != d.connectable {
            out.insert("connectable", flag(self.connectable));
        }
        if self.placeholder != d.placeholder {
            out.insert("placeholder", self.placeholder.clone());
        }
        if self.tooltip != d.tooltip {
            out.insert("tooltip", self.tooltip.clone());
        }
        if self.link != d.link {
            out.insert("link", self.link.clone());
        }
        if self.image_align != d.image_align {
            out.insert("imageAlign", self.image_align.clone());
        }
        if self.image_vertical_align != d.image_vertical_align {
            out.insert("imageVerticalAlign", self.image_vertical_align.clone());
        }
        if self.spacing_top != d.spacing_top {
            out.insert("spacingTop", self.spacing_top.to_string());
        }
        if self.spacing_right != d.spacing_right {
            out.insert("spacingRight", self.spacing_right.to_string());
        }
        if self.spacing_bottom != d.spacing_bottom {
            out.insert("spacingBottom", self.spacing_bottom.to_string());
        }
        if self.spacing_left != d.spacing_left {
            out.insert("spacingLeft", self.spacing_left.to_string());
        }
    }

    /// Reads an element style back from a parsed style-string. Unknown keys are ignored and
    /// missing or unreadable keys keep their defaults.
    pub fn from_style(s: &StyleString) -> Self {
        let mut out = Self::default();

        if let Some(v) = s.get("fillColor") {
            out.fill_color = v.to_string();
        }
        if let Some(v) = s.get_f64("fillOpacity") {
            out.fill_opacity = v;
        }
        if let Some(v) = s.get_bool("gradient") {
            out.gradient = v;
        }
        if let Some(v) = s.get("gradientColor") {
            out.gradient_color = v.to_string();
        }
        if let Some(v) = s.get("gradientDirection") {
            out.gradient_direction = v.to_string();
        }
        if let Some(v) = s.get("strokeColor") {
            out.stroke_color = v.to_string();
        }
        if let Some(v) = s.get_i64("strokeWidth") {
            out.stroke_width = v;
        }
        if let Some(v) = s.get_f64("strokeOpacity") {
            out.stroke_opacity = v;
        }
        if let Some(v) = s.get_f64("opacity") {
            out.opacity = v;
        }
        if let Some(v) = s.get_i64("fontSize") {
            out.font_size = v;
        }
        if let Some(v) = s.get("fontFamily") {
            out.font_family = v.to_string();
        }
        if let Some(v) = s.get("fontColor") {
            out.font_color = v.to_string();
        }
        if let Some(v) = s.get_i64("fontStyle") {
            out.font_style = FontStyle::from_bits(v);
        }
        if let Some(v) = s.get("align") {
            out.text_align = TextAlign::parse(v);
        }
        if let Some(v) = s.get_f64("textOpacity") {
            out.text_opacity = v;
        }
        if let Some(v) = s.get_bool("shadow") {
            out.shadow = v;
        }
        if let Some(v) = s.get("shadowColor") {
            out.shadow_color = v.to_string();
        }
        if let Some(v) = s.get_f64("shadowOpacity") {
            out.shadow_opacity = v;
        }
        if let Some(v) = s.get_i64("shadowOffsetX") {
            out.shadow_offset_x = v;
        }
        if let Some(v) = s.get_i64("shadowOffsetY") {
            out.shadow_offset_y = v;
        }
        if let Some(v) = s.get_bool("dashed") {
            out.dashed = v;
        }
        if let Some(v) = s.get("dashPattern") {
            out.dash_pattern = v.to_string();
        }
        if let Some(v) = s.get_bool("rounded") {
            out.rounded = v;
        }
        if let Some(v) = s.get_i64("arcSize") {
            out.rounded_radius = v;
        }
        if let Some(v) = s.get_bool("glass") {
            out.glass = v;
        }
        if let Some(v) = s.get_i64("rotation") {
            out.rotation = v;
        }
        if let Some(v) = s.get_bool("flipH") {
            out.flip_horizontal = v;
        }
        if let Some(v) = s.get_bool("flipV") {
            out.flip_vertical = v;
        }
        if let Some(v) = s.get("aspect") {
            out.aspect_lock = v.trim() == "fixed";
        }
        if let Some(v) = s.get_bool("autosize") {
            out.auto_size = v;
        }
        if let Some(v) = s.get_bool("resizable") {
            out.resizable = v;
        }
        if let Some(v) = s.get_bool("connectable") {
            out.connectable = v;
        }
        if let Some(v) = s.get("placeholder") {
            out.placeholder = v.to_string();
        }
        if let Some(v) = s.get("tooltip") {
            out.tooltip = v.to_string();
        }
        if let Some(v) = s.get("link") {
            out.link = v.to_string();
        }
        if let Some(v) = s.get("imageAlign") {
            out.image_align = v.to_string();
        }
        if let Some(v) = s.get("imageVerticalAlign") {
            out.image_vertical_align = v.to_string();
        }
        if let Some(v) = s.get_i64("spacingTop") {
            out.spacing_top = v;
        }
        if let Some(v) = s.get_i64("spacingRight") {
            out.spacing_right = v;
        }
        if let Some(v) = s.get_i64("spacingBottom") {
            out.spacing_bottom = v;
        }
        if let Some(v) = s.get_i64("spacingLeft") {
            out.spacing_left = v;
        }
        out
    }
}
