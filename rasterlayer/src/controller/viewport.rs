//! The viewport controller.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::{
    ControllerConfig, ControllerError, ControllerState, FetchCompletion, ParamsChange, DEFAULT_OPACITY,
};
use crate::backend::RasterBackend;
use crate::cache::{CacheStats, FetchOrder, InstallOutcome, TileCache};
use crate::coord::Viewport;
use crate::fetch::{FetchError, TileFetcher};
use crate::map::MapSurface;
use crate::planner::{TileFootprint, TileRequestPlanner};
use crate::raster::{ParamsError, RasterInfo, RasterParams, ResamplingMethod};

/// Drives the planner → cache → fetcher → map pipeline for one map.
///
/// All state lives here. Methods run synchronously except where they wait
/// on the backend; fetches run as spawned tasks and report back through
/// [`FetchCompletion`]s, which are applied by [`handle_completion`],
/// [`settle`] or the [`run`] loop.
///
/// Must be used from within a Tokio runtime.
///
/// [`handle_completion`]: ViewportController::handle_completion
/// [`settle`]: ViewportController::settle
/// [`run`]: ViewportController::run
pub struct ViewportController<M: MapSurface> {
    pub(super) map: M,
    fetcher: TileFetcher,
    planner: TileRequestPlanner,
    footprint: Box<dyn TileFootprint + Send + Sync>,
    cache: TileCache,
    pub(super) config: ControllerConfig,
    state: ControllerState,
    info: Option<RasterInfo>,
    params: Option<RasterParams>,
    opacity: f64,
    resampling: ResamplingMethod,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    pub(super) completions_rx: Option<mpsc::UnboundedReceiver<FetchCompletion>>,
}

impl<M: MapSurface> ViewportController<M> {
    pub fn new(map: M, backend: Arc<dyn RasterBackend>, config: ControllerConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            map,
            fetcher: TileFetcher::new(backend),
            planner: TileRequestPlanner::new(config.planner),
            footprint: config.footprint(),
            cache: TileCache::new(config.padding),
            opacity: initial_opacity(config.opacity),
            resampling: config.resampling,
            config,
            state: ControllerState::Empty,
            info: None,
            params: None,
            completions_tx,
            completions_rx: Some(completions_rx),
        }
    }

    /// Replace the footprint derived from the configuration.
    pub fn with_footprint<F>(mut self, footprint: F) -> Self
    where
        F: TileFootprint + Send + Sync + 'static,
    {
        self.footprint = Box::new(footprint);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Metadata of the open raster.
    pub fn raster_info(&self) -> Option<&RasterInfo> {
        self.info.as_ref()
    }

    /// Rendering parameters of the open raster.
    pub fn params(&self) -> Option<&RasterParams> {
        self.params.as_ref()
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn resampling(&self) -> ResamplingMethod {
        self.resampling
    }

    /// Open a raster, replacing any current one.
    ///
    /// Evicts every tile, asks the backend for the raster metadata, fits the
    /// map to the raster and runs one pipeline pass. On failure the
    /// controller is left `Empty`.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Backend` when the backend cannot open the
    /// raster.
    pub async fn load_raster(&mut self, path: &str) -> Result<RasterInfo, ControllerError> {
        self.invalidate();
        info!(path, "Loading raster");

        let info = match self.fetcher.backend().load_raster_info(path).await {
            Ok(info) => info,
            Err(e) => {
                warn!(path, error = %e, "Failed to load raster");
                self.reset();
                return Err(e.into());
            }
        };

        let params = match RasterParams::new(path)
            .with_bands(info.default_bands())
            .with_resampling(self.resampling)
            .with_opacity(self.opacity)
        {
            Ok(params) => params,
            Err(e) => {
                self.reset();
                return Err(e.into());
            }
        };

        if !info.supported_resampling().contains(&self.resampling) {
            debug!(resampling = %self.resampling, "Backend does not advertise resampling method");
        }

        info!(
            path,
            bands = info.count,
            selection = %params.bands(),
            width = ?info.width,
            height = ?info.height,
            "Raster loaded"
        );

        self.map.fit_to_bounds(info.bounds);
        self.info = Some(info.clone());
        self.params = Some(params);
        self.state = ControllerState::Active;
        self.on_viewport_change();
        Ok(info)
    }

    /// Plan the current viewport and issue fetches for missing tiles.
    ///
    /// Returns the number of fetches issued. Does nothing while `Empty`.
    pub fn on_viewport_change(&mut self) -> usize {
        if self.state != ControllerState::Active {
            return 0;
        }
        let (Some(info), Some(params)) = (&self.info, &self.params) else {
            return 0;
        };

        let viewport = Viewport::new(self.map.current_bounds(), self.map.zoom());
        let extent = info.extent();
        let params = params.clone();

        let generation = self.cache.advance_generation();
        let tiles = self.planner.plan(&viewport, &extent, self.footprint.as_ref());
        let zoom = extent.clamp_zoom(viewport.zoom);
        let orders = self.cache.reconcile(&tiles, &viewport.bounds, &mut self.map);

        debug!(
            generation,
            zoom,
            planned = tiles.len(),
            fetching = orders.len(),
            "Viewport changed"
        );
        self.spawn_fetches(orders, zoom, &params)
    }

    /// Apply a parameter change.
    ///
    /// Opacity is applied to existing overlays in place. Band and resampling
    /// changes evict every tile and re-run the pipeline; unchanged values are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Params` for an out-of-range opacity or band,
    /// and `ControllerError::NoRaster` for a band change with no raster open.
    /// Nothing is invalidated on error.
    pub fn on_params_change(&mut self, change: ParamsChange) -> Result<(), ControllerError> {
        match change {
            ParamsChange::Opacity(opacity) => {
                if !(0.0..=1.0).contains(&opacity) {
                    return Err(ParamsError::OpacityOutOfRange(opacity).into());
                }
                self.opacity = opacity;
                if let Some(params) = self.params.as_mut() {
                    params.set_opacity(opacity)?;
                }
                let updated = self.cache.set_opacity(opacity, &mut self.map);
                debug!(opacity, updated, "Updated overlay opacity");
            }
            ParamsChange::Bands(bands) => {
                let (Some(info), Some(params)) = (&self.info, self.params.as_mut()) else {
                    return Err(ControllerError::NoRaster);
                };
                bands.validate_against(info.count)?;
                if params.bands() == bands {
                    return Ok(());
                }
                params.set_bands(bands);
                info!(bands = %bands, "Band selection changed");
                self.refresh();
            }
            ParamsChange::Resampling(resampling) => {
                if self.resampling == resampling {
                    return Ok(());
                }
                self.resampling = resampling;
                if let Some(params) = self.params.as_mut() {
                    params.set_resampling(resampling);
                    info!(resampling = %resampling, "Resampling method changed");
                    self.refresh();
                }
            }
        }
        Ok(())
    }

    /// Close the raster, removing every tile.
    pub fn close(&mut self) {
        let evicted = self.invalidate();
        if let Some(params) = &self.params {
            info!(path = params.path(), evicted, "Raster closed");
        }
        self.reset();
    }

    /// Apply a fetch result to the cache.
    pub fn handle_completion(&mut self, completion: FetchCompletion) -> InstallOutcome {
        self.cache.complete(
            completion.key,
            completion.generation,
            completion.result,
            self.opacity,
            &mut self.map,
        )
    }

    /// Wait until no fetch is pending, applying results as they arrive.
    pub async fn settle(&mut self) {
        let mut completions = self.take_completions();
        while self.cache.pending_count() > 0 {
            let Some(completion) = completions.recv().await else {
                break;
            };
            self.handle_completion(completion);
        }
        self.completions_rx = Some(completions);
    }

    pub(super) fn take_completions(&mut self) -> mpsc::UnboundedReceiver<FetchCompletion> {
        match self.completions_rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.completions_tx = tx;
                rx
            }
        }
    }

    fn refresh(&mut self) {
        self.invalidate();
        self.on_viewport_change();
    }

    /// Evict everything and start a new generation.
    fn invalidate(&mut self) -> usize {
        let evicted = self.cache.evict_all(&mut self.map);
        self.cache.advance_generation();
        evicted
    }

    fn reset(&mut self) {
        self.state = ControllerState::Empty;
        self.info = None;
        self.params = None;
    }

    fn spawn_fetches(&self, orders: Vec<FetchOrder>, zoom: u8, params: &RasterParams) -> usize {
        let count = orders.len();
        for order in orders {
            let fetcher = self.fetcher.clone();
            let params = params.clone();
            let completions = self.completions_tx.clone();
            tokio::spawn(async move {
                let result = fetcher.fetch(order.bounds, zoom, &params, &order.cancel).await;
                if matches!(result, Err(FetchError::Cancelled)) {
                    return;
                }
                // Receiver gone means the controller was dropped
                let _ = completions.send(FetchCompletion {
                    key: order.key,
                    generation: order.generation,
                    result,
                });
            });
        }
        count
    }
}

/// Configured opacity clamped to [0, 1]; non-finite values fall back to opaque.
fn initial_opacity(opacity: f64) -> f64 {
    if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        DEFAULT_OPACITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::coord::GeoBounds;
    use crate::fetch::TileImage;
    use crate::map::HeadlessMap;
    use crate::planner::FixedFootprint;
    use crate::raster::BandSelection;
    use image::RgbaImage;

    fn controller_with(backend: Arc<MockBackend>) -> ViewportController<HeadlessMap> {
        let map = HeadlessMap::new(GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap(), 3);
        let backend: Arc<dyn RasterBackend> = backend;
        ViewportController::new(map, backend, ControllerConfig::default()).with_footprint(FixedFootprint(0.05))
    }

    /// Backend whose raster is a single row of `columns` 0.05° tiles.
    fn strip_backend(columns: u32) -> Arc<MockBackend> {
        let backend = Arc::new(MockBackend::new());
        let east = -74.2 + 0.05 * columns as f64;
        let bounds = GeoBounds::new(4.5, -74.2, 4.55, east).unwrap();
        backend.set_info(Ok(RasterInfo::new(bounds, 4)));
        backend
    }

    async fn next_completion(controller: &mut ViewportController<HeadlessMap>) -> FetchCompletion {
        controller.completions_rx.as_mut().unwrap().recv().await.unwrap()
    }

    #[tokio::test]
    async fn test_load_raster_activates_and_fetches() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend.clone());

        let info = controller.load_raster("/data/vergel.tif").await.unwrap();

        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.map().current_bounds(), info.bounds);
        assert_eq!(controller.params().unwrap().bands(), BandSelection::new(1, 2, 3).unwrap());
        assert_eq!(controller.cache().pending_count(), 8);
        assert_eq!(backend.info_requests(), vec!["/data/vergel.tif".to_string()]);

        controller.settle().await;
        assert_eq!(controller.map().overlay_count(), 8);
        assert_eq!(controller.cache().loaded_count(), 8);
        assert_eq!(backend.tile_requests().len(), 8);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_empty() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend.clone());
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;

        backend.set_info(Err(BackendError::Backend("No such file".into())));
        let err = controller.load_raster("/data/missing.tif").await.unwrap_err();

        assert_eq!(err, ControllerError::Backend(BackendError::Backend("No such file".into())));
        assert_eq!(controller.state(), ControllerState::Empty);
        assert!(controller.raster_info().is_none());
        assert!(controller.cache().is_empty());
        assert_eq!(controller.map().overlay_count(), 0);
    }

    #[tokio::test]
    async fn test_non_finite_configured_opacity_loads_opaque() {
        let backend: Arc<dyn RasterBackend> = Arc::new(MockBackend::new());
        let map = HeadlessMap::new(GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap(), 3);
        let config = ControllerConfig::default().with_opacity(f64::NAN);
        let mut controller = ViewportController::new(map, backend, config).with_footprint(FixedFootprint(0.05));
        assert_eq!(controller.opacity(), DEFAULT_OPACITY);

        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;

        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.params().unwrap().opacity(), DEFAULT_OPACITY);
        assert!(controller.map().overlays().all(|(_, o)| o.opacity == DEFAULT_OPACITY));
    }

    #[test]
    fn test_initial_opacity_is_clamped() {
        assert_eq!(initial_opacity(1.7), 1.0);
        assert_eq!(initial_opacity(-0.2), 0.0);
        assert_eq!(initial_opacity(0.4), 0.4);
        assert_eq!(initial_opacity(f64::INFINITY), DEFAULT_OPACITY);
    }

    #[tokio::test]
    async fn test_viewport_change_while_empty_is_noop() {
        let mut controller = controller_with(Arc::new(MockBackend::new()));
        assert_eq!(controller.on_viewport_change(), 0);
        assert_eq!(controller.generation(), 0);
    }

    #[tokio::test]
    async fn test_repeated_viewport_change_fetches_nothing_new() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend.clone());
        controller.load_raster("/data/a.tif").await.unwrap();

        assert_eq!(controller.on_viewport_change(), 0);
        controller.settle().await;
        assert_eq!(controller.on_viewport_change(), 0);
        assert_eq!(backend.tile_requests().len(), 8);
    }

    #[tokio::test]
    async fn test_pan_away_evicts_loaded_tiles() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend);
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;

        let elsewhere = GeoBounds::new(10.0, 10.0, 11.0, 11.0).unwrap();
        controller.map_mut().pan_to(elsewhere);
        assert_eq!(controller.on_viewport_change(), 0);

        assert!(controller.cache().is_empty());
        assert_eq!(controller.map().overlay_count(), 0);
        assert_eq!(controller.stats().evictions, 8);
    }

    #[tokio::test]
    async fn test_opacity_updates_in_place() {
        let backend = strip_backend(3);
        let mut controller = controller_with(backend.clone());
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;
        assert_eq!(controller.cache().loaded_count(), 3);
        let generation = controller.generation();

        controller.on_params_change(ParamsChange::Opacity(0.5)).unwrap();

        assert_eq!(backend.tile_requests().len(), 3);
        assert_eq!(controller.generation(), generation);
        assert_eq!(controller.map().overlay_count(), 3);
        assert!(controller.map().overlays().all(|(_, o)| o.opacity == 0.5));
        assert_eq!(controller.params().unwrap().opacity(), 0.5);
    }

    #[tokio::test]
    async fn test_invalid_opacity_rejected() {
        let mut controller = controller_with(Arc::new(MockBackend::new()));
        let err = controller.on_params_change(ParamsChange::Opacity(1.5)).unwrap_err();
        assert_eq!(err, ControllerError::Params(ParamsError::OpacityOutOfRange(1.5)));
        assert_eq!(controller.opacity(), 1.0);
    }

    #[tokio::test]
    async fn test_band_change_evicts_loaded_and_pending() {
        let backend = strip_backend(4);
        let mut controller = controller_with(backend.clone());
        controller.load_raster("/data/a.tif").await.unwrap();

        // Install three tiles and leave the fourth pending
        for _ in 0..3 {
            let completion = next_completion(&mut controller).await;
            assert!(matches!(
                controller.handle_completion(completion),
                InstallOutcome::Installed(_)
            ));
        }
        assert_eq!(controller.cache().loaded_count(), 3);
        assert_eq!(controller.cache().pending_count(), 1);
        let generation = controller.generation();

        let bands = BandSelection::new(4, 3, 2).unwrap();
        controller.on_params_change(ParamsChange::Bands(bands)).unwrap();

        let stats = controller.stats();
        assert_eq!(stats.evictions, 4);
        assert_eq!(stats.cancellations, 1);
        assert!(controller.generation() > generation);
        assert_eq!(controller.map().overlay_count(), 0);
        assert_eq!(controller.cache().pending_count(), 4);

        controller.settle().await;
        assert_eq!(controller.map().overlay_count(), 4);
        let refetched = backend.tile_requests().iter().filter(|r| r.bands == bands).count();
        assert_eq!(refetched, 4);
    }

    #[tokio::test]
    async fn test_out_of_range_band_keeps_cache() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend);
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;
        let generation = controller.generation();

        let err = controller
            .on_params_change(ParamsChange::Bands(BandSelection::new(5, 1, 1).unwrap()))
            .unwrap_err();

        assert!(matches!(err, ControllerError::Params(ParamsError::BandOutOfRange { .. })));
        assert_eq!(controller.generation(), generation);
        assert_eq!(controller.map().overlay_count(), 8);
    }

    #[tokio::test]
    async fn test_band_change_without_raster() {
        let mut controller = controller_with(Arc::new(MockBackend::new()));
        let err = controller
            .on_params_change(ParamsChange::Bands(BandSelection::default()))
            .unwrap_err();
        assert_eq!(err, ControllerError::NoRaster);
    }

    #[tokio::test]
    async fn test_result_from_previous_generation_attaches_nothing() {
        let backend = strip_backend(2);
        let mut controller = controller_with(backend);
        controller.load_raster("/data/a.tif").await.unwrap();

        let (key, issued) = controller
            .cache()
            .entries()
            .find_map(|(key, entry)| entry.pending_generation().map(|g| (*key, g)))
            .unwrap();

        controller
            .on_params_change(ParamsChange::Resampling(ResamplingMethod::Lanczos))
            .unwrap();
        assert!(controller.generation() > issued);

        let late = FetchCompletion {
            key,
            generation: issued,
            result: Ok(TileImage::new(key.bounds(), 12, RgbaImage::new(1, 1))),
        };
        assert_eq!(controller.handle_completion(late), InstallOutcome::Stale);
        assert_eq!(controller.map().overlay_count(), 0);
        assert!(controller.cache().get(&key).unwrap().is_pending());

        controller.settle().await;
        assert_eq!(controller.map().overlay_count(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_resampling_is_noop() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend.clone());
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;
        let generation = controller.generation();

        controller
            .on_params_change(ParamsChange::Resampling(ResamplingMethod::Bilinear))
            .unwrap();

        assert_eq!(controller.generation(), generation);
        assert_eq!(backend.tile_requests().len(), 8);
    }

    #[tokio::test]
    async fn test_failed_tiles_retry_on_next_pass() {
        let backend = strip_backend(2);
        backend.fail_tiles(BackendError::Transport("connection reset".into()));
        let mut controller = controller_with(backend.clone());
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;

        assert_eq!(controller.cache().failed_count(), 2);
        assert_eq!(controller.map().overlay_count(), 0);

        backend.set_tile_payload(
            &TileImage::new(key_bounds(), 0, RgbaImage::new(1, 1))
                .encode_base64_png()
                .unwrap(),
        );
        assert_eq!(controller.on_viewport_change(), 2);
        controller.settle().await;

        assert_eq!(controller.map().overlay_count(), 2);
        assert_eq!(controller.stats().failures, 2);
    }

    #[tokio::test]
    async fn test_close_removes_everything() {
        let backend = Arc::new(MockBackend::new());
        let mut controller = controller_with(backend);
        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;

        controller.close();

        assert_eq!(controller.state(), ControllerState::Empty);
        assert!(controller.params().is_none());
        assert!(controller.cache().is_empty());
        assert_eq!(controller.map().overlay_count(), 0);
        assert_eq!(controller.on_viewport_change(), 0);
    }

    #[tokio::test]
    async fn test_opacity_carries_into_new_tiles() {
        let backend = strip_backend(2);
        let mut controller = controller_with(backend);
        controller.on_params_change(ParamsChange::Opacity(0.3)).unwrap();

        controller.load_raster("/data/a.tif").await.unwrap();
        controller.settle().await;

        assert!(controller.map().overlays().all(|(_, o)| o.opacity == 0.3));
    }

    fn key_bounds() -> GeoBounds {
        GeoBounds::new(4.5, -74.2, 4.55, -74.15).unwrap()
    }
}
