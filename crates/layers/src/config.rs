use tiling::{RowOrder, TemplateSource, TileCoord, WmtsLayer, WmtsProvider};

use crate::symbology::LayerStyle;

/// Default styles for the layer stack, base to overlay: deeper layers sit
/// behind shallower ones, labels render opaque on top.
pub const BASE_STYLE: LayerStyle = LayerStyle::new(-12.0, 0.95);
pub const LABEL_STYLE: LayerStyle = LayerStyle::new(-11.5, 1.0);
pub const TEMPLATE_STYLE: LayerStyle = LayerStyle::new(-12.2, 0.95);
pub const OVERLAY_STYLE: LayerStyle = LayerStyle::new(-11.4, 1.0);

pub const DEFAULT_ZOOM: u8 = 9;

/// Host-resolved compositor configuration.
///
/// The provider token is resolved once by the host application and passed in
/// here; the core never consults ambient state for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BasemapConfig {
    pub token: Option<String>,
    pub base_layer: WmtsLayer,
    pub zoom: u8,
    pub label_layer: Option<WmtsLayer>,
    pub label_enabled: bool,
    pub template: Option<String>,
    pub overlay_template: Option<String>,
    pub template_zoom: u8,
    /// Row-flip flag for template sources (TMS addressing).
    pub tms_rows: bool,
    pub base_style: LayerStyle,
    pub label_style: LayerStyle,
    pub template_style: LayerStyle,
    pub overlay_style: LayerStyle,
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_layer: WmtsLayer::Imagery,
            zoom: DEFAULT_ZOOM,
            label_layer: None,
            label_enabled: false,
            template: None,
            overlay_template: None,
            template_zoom: DEFAULT_ZOOM,
            tms_rows: false,
            base_style: BASE_STYLE,
            label_style: LABEL_STYLE,
            template_style: TEMPLATE_STYLE,
            overlay_style: OVERLAY_STYLE,
        }
    }
}

/// How one layer sources its tiles.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSourceKind {
    Wmts { provider: WmtsProvider, token: String },
    Template(TemplateSource),
}

impl TileSourceKind {
    pub fn candidate_urls(&self, coord: TileCoord) -> Vec<String> {
        match self {
            TileSourceKind::Wmts { provider, token } => provider.candidate_urls(coord, token),
            TileSourceKind::Template(template) => vec![template.url(coord)],
        }
    }

    pub fn row_order(&self) -> RowOrder {
        match self {
            TileSourceKind::Wmts { .. } => RowOrder::XyzTopLeft,
            TileSourceKind::Template(template) => template.row_order,
        }
    }
}

/// One enumerate/fetch/place pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPlan {
    pub name: &'static str,
    pub source: TileSourceKind,
    pub zoom: u8,
    pub style: LayerStyle,
}

impl BasemapConfig {
    /// The layers this configuration can actually build.
    ///
    /// A missing token omits the WMTS layers entirely and a missing template
    /// omits the template layers; sibling layers are unaffected. No layer is
    /// ever an error.
    pub fn layer_plans(&self) -> Vec<LayerPlan> {
        let mut plans = Vec::new();
        let row_order = if self.tms_rows {
            RowOrder::TmsBottomLeft
        } else {
            RowOrder::XyzTopLeft
        };

        if let Some(token) = &self.token {
            plans.push(LayerPlan {
                name: "base",
                source: TileSourceKind::Wmts {
                    provider: WmtsProvider::new(self.base_layer),
                    token: token.clone(),
                },
                zoom: self.zoom,
                style: self.base_style,
            });
            if self.label_enabled
                && let Some(label_layer) = self.label_layer
            {
                plans.push(LayerPlan {
                    name: "label",
                    source: TileSourceKind::Wmts {
                        provider: WmtsProvider::new(label_layer),
                        token: token.clone(),
                    },
                    zoom: self.zoom,
                    style: self.label_style,
                });
            }
        }

        if let Some(template) = &self.template {
            plans.push(LayerPlan {
                name: "template-base",
                source: TileSourceKind::Template(TemplateSource::new(template.clone(), row_order)),
                zoom: self.template_zoom,
                style: self.template_style,
            });
        }
        if let Some(template) = &self.overlay_template {
            plans.push(LayerPlan {
                name: "template-overlay",
                source: TileSourceKind::Template(TemplateSource::new(template.clone(), row_order)),
                zoom: self.template_zoom,
                style: self.overlay_style,
            });
        }

        plans
    }
}
