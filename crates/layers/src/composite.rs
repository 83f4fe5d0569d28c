use foundation::PlanarBounds;
use foundation::math::{LonLat, Mercator};
use futures_util::future::join_all;
use streaming::{Request, TileFetcher, TileImage, TileRequest, fetch_with_fallback};
use tiling::{RowOrder, TileCoord, TileRange};
use tracing::{debug, info, warn};

use crate::config::{BasemapConfig, LayerPlan};
use crate::symbology::QuadMaterial;

/// Geographic padding applied around the aggregated bounds before
/// enumeration, degrees per side.
pub const LONLAT_PAD_DEG: f64 = 0.08;

/// Textured quad placed at a tile's planar position.
///
/// Immutable once placed; only a full rebuild removes or replaces it. The
/// rendering adapter owns turning this descriptor into scene state.
#[derive(Debug, Clone, PartialEq)]
pub struct TileQuad {
    pub coord: TileCoord,
    pub center: [f64; 2],
    pub size: [f64; 2],
    pub material: QuadMaterial,
    pub image: TileImage,
}

/// Per-tile terminal state. There is no error variant: exhausted candidates
/// degrade to `Skipped`.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Placed(TileQuad),
    Skipped(TileCoord),
}

/// A tile resolution tagged with the build generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlacement {
    pub request: Request,
    pub generation: u64,
    pub outcome: TileOutcome,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LayerStats {
    pub enumerated: usize,
    pub placed: usize,
    pub skipped: usize,
}

impl LayerStats {
    /// Settled once every enumerated tile resolved one way or the other.
    pub fn is_settled(&self) -> bool {
        self.placed + self.skipped == self.enumerated
    }
}

/// One settled layer. Partial coverage is a valid terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedLayer {
    pub name: &'static str,
    pub quads: Vec<TileQuad>,
    pub stats: LayerStats,
}

impl ComposedLayer {
    fn new(name: &'static str, enumerated: usize) -> Self {
        Self {
            name,
            quads: Vec::new(),
            stats: LayerStats {
                enumerated,
                placed: 0,
                skipped: 0,
            },
        }
    }
}

/// A settled composite across all configured layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Basemap {
    pub generation: u64,
    pub layers: Vec<ComposedLayer>,
}

impl Basemap {
    pub fn quad_count(&self) -> usize {
        self.layers.iter().map(|l| l.quads.len()).sum()
    }
}

/// Issues composite builds and owns the active generation.
///
/// A build superseded by `begin_build` is simply abandoned: its in-flight
/// fetches still resolve, but `apply` discards placements whose generation
/// no longer matches, so late resolutions are explicit no-ops instead of
/// writes into a stale composite.
#[derive(Debug, Default)]
pub struct Compositor {
    generation: u64,
    next_request: u64,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new build, superseding any in-flight one.
    pub fn begin_build(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Applies a placement to `layer`. Returns `false` (and leaves the layer
    /// untouched) for placements from a superseded build.
    pub fn apply(&self, layer: &mut ComposedLayer, placement: TilePlacement) -> bool {
        if placement.generation != self.generation {
            debug!(
                "discarding stale placement from build {} (active {})",
                placement.generation, self.generation
            );
            return false;
        }
        match placement.outcome {
            TileOutcome::Placed(quad) => {
                layer.stats.placed += 1;
                layer.quads.push(quad);
            }
            TileOutcome::Skipped(coord) => {
                layer.stats.skipped += 1;
                warn!(
                    "{}: tile z{} {}/{} skipped, all candidates exhausted",
                    layer.name, coord.z, coord.x, coord.y
                );
            }
        }
        true
    }

    /// Enumerates the covering range for a layer: unproject the planar
    /// bounds, pad geographically, normalize. Falls back to `fallback` when
    /// the primary bounds are degenerate; `None` means zero tiles.
    pub fn enumerate(
        projection: &Mercator,
        bounds: PlanarBounds,
        fallback: Option<PlanarBounds>,
        zoom: u8,
        order: RowOrder,
    ) -> Option<TileRange> {
        Self::range_for(projection, bounds, zoom, order)
            .or_else(|| fallback.and_then(|b| Self::range_for(projection, b, zoom, order)))
    }

    fn range_for(
        projection: &Mercator,
        bounds: PlanarBounds,
        zoom: u8,
        order: RowOrder,
    ) -> Option<TileRange> {
        if !bounds.is_usable() {
            return None;
        }
        let a = projection.unproject(bounds.min);
        let b = projection.unproject(bounds.max);
        let lon_min = a.lon_deg.min(b.lon_deg) - LONLAT_PAD_DEG;
        let lon_max = a.lon_deg.max(b.lon_deg) + LONLAT_PAD_DEG;
        let lat_min = a.lat_deg.min(b.lat_deg) - LONLAT_PAD_DEG;
        let lat_max = a.lat_deg.max(b.lat_deg) + LONLAT_PAD_DEG;
        TileRange::covering(lon_min, lat_min, lon_max, lat_max, zoom, order)
    }

    /// One request per tile in `range`, tagged with `generation`.
    pub fn plan_requests(
        &mut self,
        generation: u64,
        plan: &LayerPlan,
        range: TileRange,
    ) -> Vec<TileRequest> {
        range
            .iter()
            .map(|coord| {
                let id = Request(self.next_request);
                self.next_request += 1;
                TileRequest::new(id, coord, plan.source.candidate_urls(coord), generation)
            })
            .collect()
    }

    /// Full pipeline: plan layers from the configuration, run each through
    /// the identical enumerate/fetch/place sequence independently, settle.
    pub async fn compose<F: TileFetcher + ?Sized>(
        &mut self,
        config: &BasemapConfig,
        projection: &Mercator,
        bounds: PlanarBounds,
        fallback: Option<PlanarBounds>,
        fetcher: &F,
    ) -> Basemap {
        let generation = self.begin_build();
        let mut layers = Vec::new();

        for plan in config.layer_plans() {
            let order = plan.source.row_order();
            let Some(range) = Self::enumerate(projection, bounds, fallback, plan.zoom, order)
            else {
                info!("{}: no coverage, nothing enumerated", plan.name);
                layers.push(ComposedLayer::new(plan.name, 0));
                continue;
            };
            info!(
                "{}: z{} tiles x {}..={}, y {}..={} ({} total)",
                plan.name,
                range.zoom(),
                range.min.x,
                range.max.x,
                range.min.y,
                range.max.y,
                range.count()
            );

            let requests = self.plan_requests(generation, &plan, range);
            let mut layer = ComposedLayer::new(plan.name, requests.len());
            let placements = compose_layer(&plan, requests, projection, fetcher).await;
            for placement in placements {
                self.apply(&mut layer, placement);
            }
            info!(
                "{}: settled, {} placed / {} skipped",
                layer.name, layer.stats.placed, layer.stats.skipped
            );
            layers.push(layer);
        }

        Basemap { generation, layers }
    }
}

/// Runs one layer's requests to settlement: every tile is fetched
/// concurrently and resolves to exactly one placement. Placement is
/// order-independent because each quad's position derives from its own
/// tile's edges.
pub async fn compose_layer<F: TileFetcher + ?Sized>(
    plan: &LayerPlan,
    requests: Vec<TileRequest>,
    projection: &Mercator,
    fetcher: &F,
) -> Vec<TilePlacement> {
    let order = plan.source.row_order();
    let fetches = requests.into_iter().map(|request| async move {
        let outcome = match fetch_with_fallback(fetcher, &request.urls).await {
            Some(image) => TileOutcome::Placed(place_quad(request.coord, order, plan, projection, image)),
            None => TileOutcome::Skipped(request.coord),
        };
        TilePlacement {
            request: request.id,
            generation: request.generation,
            outcome,
        }
    });
    join_all(fetches).await
}

/// Sizes and positions one quad from its tile's geographic edges, projected
/// through the same Mercator instance as the vector geometry.
fn place_quad(
    coord: TileCoord,
    order: RowOrder,
    plan: &LayerPlan,
    projection: &Mercator,
    image: TileImage,
) -> TileQuad {
    let edges = coord.lonlat_edges(order);
    let [x_left, y_top] = projection.project(LonLat::new(edges.lon_left, edges.lat_top));
    let [x_right, y_bottom] = projection.project(LonLat::new(edges.lon_right, edges.lat_bottom));

    TileQuad {
        coord,
        center: [(x_left + x_right) / 2.0, (y_top + y_bottom) / 2.0],
        size: [(x_right - x_left).abs(), (y_bottom - y_top).abs()],
        material: QuadMaterial::clipped(plan.style.opacity, plan.style.depth_offset),
        image,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use foundation::PlanarBounds;
    use foundation::math::{LonLat, Mercator};
    use streaming::{FetchError, TileFetcher, TileFormat, TileImage};
    use tiling::RowOrder;

    use super::{Compositor, compose_layer};
    use crate::config::BasemapConfig;

    /// Fails any URL on a listed shard host; succeeds elsewhere.
    struct ShardOutage {
        dead_prefixes: Vec<String>,
        attempts: Mutex<usize>,
    }

    impl ShardOutage {
        fn new(dead: &[&str]) -> Self {
            Self {
                dead_prefixes: dead.iter().map(|s| s.to_string()).collect(),
                attempts: Mutex::new(0),
            }
        }

        fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl TileFetcher for ShardOutage {
        async fn fetch_url(&self, url: &str) -> Result<TileImage, FetchError> {
            *self.attempts.lock().unwrap() += 1;
            if self.dead_prefixes.iter().any(|p| url.starts_with(p)) {
                return Err(FetchError::Status(503));
            }
            Ok(TileImage::new(Bytes::from_static(b"px"), TileFormat::Png))
        }
    }

    /// Everything fails: the composite must settle with every tile skipped.
    struct Blackout;

    #[async_trait]
    impl TileFetcher for Blackout {
        async fn fetch_url(&self, _url: &str) -> Result<TileImage, FetchError> {
            Err(FetchError::Transport("connection refused".to_string()))
        }
    }

    fn yunnan_bounds(projection: &Mercator) -> PlanarBounds {
        let mut b = PlanarBounds::empty();
        b.include(projection.project(LonLat::new(100.0, 20.0)));
        b.include(projection.project(LonLat::new(106.0, 29.0)));
        b
    }

    fn config_with_token() -> BasemapConfig {
        BasemapConfig {
            token: Some("tk".to_string()),
            zoom: 6,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn composite_settles_with_full_coverage() {
        let projection = Mercator::default();
        let bounds = yunnan_bounds(&projection);
        let fetcher = ShardOutage::new(&[]);
        let mut compositor = Compositor::new();

        let basemap = compositor
            .compose(&config_with_token(), &projection, bounds, None, &fetcher)
            .await;
        assert_eq!(basemap.layers.len(), 1);
        let layer = &basemap.layers[0];
        assert!(layer.stats.enumerated > 0);
        assert!(layer.stats.is_settled());
        assert_eq!(layer.stats.skipped, 0);
        assert_eq!(layer.quads.len(), layer.stats.enumerated);

        // Every quad sits inside the padded projected bounds.
        let padded = bounds.padded(bounds.width());
        for quad in &layer.quads {
            assert!(quad.center[0] > padded.min[0] && quad.center[0] < padded.max[0]);
            assert!(quad.size[0] > 0.0 && quad.size[1] > 0.0);
        }
    }

    #[tokio::test]
    async fn dead_shards_degrade_to_fallback_not_skips() {
        let projection = Mercator::default();
        let bounds = yunnan_bounds(&projection);
        // Kill the shards this range's tiles rotate through first, so every
        // tile has to fall back at least once before finding a live host.
        let fetcher = ShardOutage::new(&[
            "https://t3.",
            "https://t4.",
            "https://t5.",
            "https://t6.",
        ]);
        let mut compositor = Compositor::new();

        let basemap = compositor
            .compose(&config_with_token(), &projection, bounds, None, &fetcher)
            .await;
        let layer = &basemap.layers[0];
        assert_eq!(layer.stats.skipped, 0);
        assert_eq!(layer.stats.placed, layer.stats.enumerated);
        assert!(
            fetcher.attempts() > layer.stats.enumerated,
            "fallback must have retried past dead shards"
        );
    }

    #[tokio::test]
    async fn blackout_settles_with_everything_skipped() {
        let projection = Mercator::default();
        let bounds = yunnan_bounds(&projection);
        let mut compositor = Compositor::new();

        let basemap = compositor
            .compose(&config_with_token(), &projection, bounds, None, &Blackout)
            .await;
        let layer = &basemap.layers[0];
        assert!(layer.stats.enumerated > 0);
        assert_eq!(layer.stats.placed, 0);
        assert_eq!(layer.stats.skipped, layer.stats.enumerated);
        assert!(layer.stats.is_settled());
        assert!(layer.quads.is_empty());
    }

    #[tokio::test]
    async fn stale_generation_placements_are_discarded() {
        let projection = Mercator::default();
        let bounds = yunnan_bounds(&projection);
        let fetcher = ShardOutage::new(&[]);
        let mut compositor = Compositor::new();
        let config = config_with_token();
        let plans = config.layer_plans();
        let plan = &plans[0];

        let stale_generation = compositor.begin_build();
        let range = Compositor::enumerate(
            &projection,
            bounds,
            None,
            plan.zoom,
            RowOrder::XyzTopLeft,
        )
        .unwrap();
        let requests = compositor.plan_requests(stale_generation, plan, range);
        let placements = compose_layer(plan, requests, &projection, &fetcher).await;

        // A rebuild supersedes the in-flight one before its placements land.
        compositor.begin_build();

        let mut layer = super::ComposedLayer::new("base", placements.len());
        for placement in placements {
            assert!(!compositor.apply(&mut layer, placement));
        }
        assert!(layer.quads.is_empty());
        assert_eq!(layer.stats.placed, 0);
    }

    #[tokio::test]
    async fn degenerate_bounds_fall_back_then_enumerate_nothing() {
        let projection = Mercator::default();
        let fetcher = ShardOutage::new(&[]);
        let mut compositor = Compositor::new();

        // Degenerate primary, usable fallback: the fallback drives coverage.
        let fallback = yunnan_bounds(&projection);
        let basemap = compositor
            .compose(
                &config_with_token(),
                &projection,
                PlanarBounds::empty(),
                Some(fallback),
                &fetcher,
            )
            .await;
        assert!(basemap.layers[0].stats.enumerated > 0);

        // Both degenerate: zero tiles, still a settled composite.
        let basemap = compositor
            .compose(
                &config_with_token(),
                &projection,
                PlanarBounds::empty(),
                None,
                &fetcher,
            )
            .await;
        let layer = &basemap.layers[0];
        assert_eq!(layer.stats.enumerated, 0);
        assert!(layer.stats.is_settled());
    }

    #[tokio::test]
    async fn quads_tile_the_plane_without_overlap() {
        let projection = Mercator::default();
        let bounds = yunnan_bounds(&projection);
        let fetcher = ShardOutage::new(&[]);
        let mut compositor = Compositor::new();

        let basemap = compositor
            .compose(&config_with_token(), &projection, bounds, None, &fetcher)
            .await;
        let layer = &basemap.layers[0];

        // Neighboring quads in the same row abut: centers are one width apart.
        let mut row: Vec<_> = layer
            .quads
            .iter()
            .filter(|q| q.coord.y == layer.quads[0].coord.y)
            .collect();
        row.sort_by(|a, b| a.coord.x.cmp(&b.coord.x));
        for pair in row.windows(2) {
            let gap = pair[1].center[0] - pair[0].center[0];
            let expected = (pair[0].size[0] + pair[1].size[0]) / 2.0;
            assert!((gap - expected).abs() < 1e-6, "gap {gap} vs {expected}");
        }
    }
}
