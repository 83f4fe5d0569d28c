use serde::{Deserialize, Serialize};

use crate::coord::{RowOrder, TileCoord};

/// Deterministic subdomain shard for a tile: `(x + y) % shard_count`.
///
/// Spreads requests across sibling subdomains serving identical content so
/// per-host connection limits don't serialize a whole layer build.
pub fn shard_for(x: u32, y: u32, shard_count: u32) -> u32 {
    if shard_count == 0 {
        return 0;
    }
    ((x as u64 + y as u64) % shard_count as u64) as u32
}

/// Layer kinds served by the sharded WMTS provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WmtsLayer {
    Imagery,
    Annotation,
    Terrain,
}

impl WmtsLayer {
    /// Provider-side layer id; also the URL path prefix (with the `_w`
    /// tile-matrix-set suffix).
    pub fn layer_id(self) -> &'static str {
        match self {
            WmtsLayer::Imagery => "img",
            WmtsLayer::Annotation => "cva",
            WmtsLayer::Terrain => "ter",
        }
    }

    /// Parses a configured layer name, accepting the legacy `img_w`-style
    /// aliases alongside the canonical `tdt-img` forms.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "tdt-img" | "img_w" | "img" => Some(WmtsLayer::Imagery),
            "tdt-cva" | "cva_w" | "cva" => Some(WmtsLayer::Annotation),
            "tdt-ter" | "ter_w" | "ter" => Some(WmtsLayer::Terrain),
            _ => None,
        }
    }
}

/// Sharded WMTS tile provider: `shard_count` subdomains (`t0.` .. `tN.`)
/// serving identical tiles behind a query-string tile address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsProvider {
    pub host: String,
    pub layer: WmtsLayer,
    pub shard_count: u32,
}

pub const DEFAULT_WMTS_HOST: &str = "tianditu.gov.cn";
pub const DEFAULT_SHARD_COUNT: u32 = 8;

impl WmtsProvider {
    pub fn new(layer: WmtsLayer) -> Self {
        Self {
            host: DEFAULT_WMTS_HOST.to_string(),
            layer,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }

    /// The WMTS GetTile URL on one specific shard.
    pub fn url(&self, coord: TileCoord, token: &str, shard: u32) -> String {
        let s = shard.min(self.shard_count.saturating_sub(1));
        let id = self.layer.layer_id();
        format!(
            "https://t{s}.{host}/{id}_w/wmts?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER={id}&STYLE=default&TILEMATRIXSET=w&FORMAT=tiles&TILEMATRIX={z}&TILECOL={x}&TILEROW={y}&tk={token}",
            host = self.host,
            z = coord.z,
            x = coord.x,
            y = coord.y,
        )
    }

    /// All shard URLs for `coord`, rotated to start at the tile's own shard.
    ///
    /// The fetcher tries these strictly in order, so rotation balances which
    /// subdomain takes the first hit while every shard remains a fallback.
    pub fn candidate_urls(&self, coord: TileCoord, token: &str) -> Vec<String> {
        let start = shard_for(coord.x, coord.y, self.shard_count);
        (0..self.shard_count)
            .map(|i| self.url(coord, token, (start + i) % self.shard_count))
            .collect()
    }
}

/// `{z}/{x}/{y}` template tile source with a configurable row convention.
/// One candidate URL per tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSource {
    pub template: String,
    pub row_order: RowOrder,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>, row_order: RowOrder) -> Self {
        Self {
            template: template.into(),
            row_order,
        }
    }

    pub fn url(&self, coord: TileCoord) -> String {
        self.template
            .replacen("{z}", &coord.z.to_string(), 1)
            .replacen("{x}", &coord.x.to_string(), 1)
            .replacen("{y}", &coord.y.to_string(), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SHARD_COUNT, TemplateSource, WmtsLayer, WmtsProvider, shard_for};
    use crate::coord::{RowOrder, TileCoord};

    #[test]
    fn shard_is_deterministic_and_in_range() {
        for x in [0u32, 1, 7, 420, u32::MAX] {
            for y in [0u32, 3, 221, u32::MAX] {
                let s = shard_for(x, y, DEFAULT_SHARD_COUNT);
                assert!(s < DEFAULT_SHARD_COUNT);
                assert_eq!(s, shard_for(x, y, DEFAULT_SHARD_COUNT));
            }
        }
        assert_eq!(shard_for(3, 4, 8), 7);
        assert_eq!(shard_for(4, 4, 8), 0);
    }

    #[test]
    fn zero_shards_never_divides_by_zero() {
        assert_eq!(shard_for(10, 20, 0), 0);
    }

    #[test]
    fn layer_aliases_parse() {
        assert_eq!(WmtsLayer::parse("tdt-img"), Some(WmtsLayer::Imagery));
        assert_eq!(WmtsLayer::parse("img_w"), Some(WmtsLayer::Imagery));
        assert_eq!(WmtsLayer::parse("cva_w"), Some(WmtsLayer::Annotation));
        assert_eq!(WmtsLayer::parse("ter"), Some(WmtsLayer::Terrain));
        assert_eq!(WmtsLayer::parse("osm"), None);
    }

    #[test]
    fn wmts_url_carries_the_full_query() {
        let p = WmtsProvider::new(WmtsLayer::Imagery);
        let url = p.url(TileCoord::new(9, 420, 221), "tk123", 5);
        assert_eq!(
            url,
            "https://t5.tianditu.gov.cn/img_w/wmts?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER=img&STYLE=default&TILEMATRIXSET=w&FORMAT=tiles&TILEMATRIX=9&TILECOL=420&TILEROW=221&tk=tk123"
        );
    }

    #[test]
    fn candidates_cover_every_shard_once_starting_at_own() {
        let p = WmtsProvider::new(WmtsLayer::Annotation);
        let coord = TileCoord::new(9, 3, 4);
        let urls = p.candidate_urls(coord, "tk");
        assert_eq!(urls.len(), DEFAULT_SHARD_COUNT as usize);
        assert!(urls[0].starts_with("https://t7."));
        let mut hosts: Vec<_> = urls
            .iter()
            .map(|u| u.split('.').next().unwrap().to_string())
            .collect();
        hosts.sort();
        hosts.dedup();
        assert_eq!(hosts.len(), DEFAULT_SHARD_COUNT as usize);
    }

    #[test]
    fn template_substitutes_each_placeholder() {
        let t = TemplateSource::new("https://tiles.example/{z}/{x}/{y}.png", RowOrder::XyzTopLeft);
        assert_eq!(
            t.url(TileCoord::new(9, 420, 221)),
            "https://tiles.example/9/420/221.png"
        );
    }
}
