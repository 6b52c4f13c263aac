//! Debounced event loop for the viewport controller.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use super::types::{ControllerCommand, ParamsChange};
use super::viewport::ViewportController;
use crate::map::MapSurface;

impl<M: MapSurface> ViewportController<M> {
    /// Run the controller until `shutdown` fires or `commands` closes.
    ///
    /// Map events restart a debounce timer; only when the map has been quiet
    /// for `config.debounce` is the latest viewport planned. Fetch results
    /// are applied as they arrive. Returns the controller so callers can
    /// inspect the final state.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ControllerCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        let (_subscription, mut events) = self.map.subscribe();
        let mut completions = self.take_completions();
        let mut deadline: Option<Instant> = None;

        info!(debounce_ms = self.config.debounce.as_millis() as u64, "Viewport controller started");

        loop {
            let wake_at = deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command).await;
                }

                Some(completion) = completions.recv() => {
                    self.handle_completion(completion);
                }

                Some(event) = events.recv() => {
                    trace!(?event, "Map event");
                    deadline = Some(Instant::now() + self.config.debounce);
                }

                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                    deadline = None;
                    self.on_viewport_change();
                }
            }
        }

        self.completions_rx = Some(completions);
        info!(stats = %self.stats(), "Viewport controller stopped");
        self
    }

    async fn handle_command(&mut self, command: ControllerCommand) {
        match command {
            ControllerCommand::LoadRaster { path, reply } => {
                let result = self.load_raster(&path).await;
                // Caller may have stopped waiting
                let _ = reply.send(result);
            }
            ControllerCommand::SetOpacity(opacity) => self.apply(ParamsChange::Opacity(opacity)),
            ControllerCommand::SetBands(bands) => self.apply(ParamsChange::Bands(bands)),
            ControllerCommand::SetResampling(method) => self.apply(ParamsChange::Resampling(method)),
            ControllerCommand::Close => self.close(),
        }
    }

    fn apply(&mut self, change: ParamsChange) {
        if let Err(e) = self.on_params_change(change) {
            warn!(error = %e, change = ?change, "Rejected parameter change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, RasterBackend};
    use crate::controller::{ControllerConfig, ControllerState};
    use crate::coord::GeoBounds;
    use crate::map::{HeadlessMap, MapEvent};
    use crate::raster::{BandSelection, ResamplingMethod};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn controller(backend: Arc<MockBackend>) -> ViewportController<HeadlessMap> {
        let map = HeadlessMap::new(GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap(), 3);
        let backend: Arc<dyn RasterBackend> = backend;
        ViewportController::new(map, backend, ControllerConfig::default().with_fixed_degrees(0.05))
    }

    async fn load(commands: &mpsc::Sender<ControllerCommand>, path: &str) {
        let (reply, rx) = oneshot::channel();
        commands
            .send(ControllerCommand::LoadRaster {
                path: path.to_string(),
                reply,
            })
            .await
            .unwrap();
        rx.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_events_coalesce_into_one_pass() {
        let backend = Arc::new(MockBackend::new());
        let controller = controller(backend.clone());
        let bus = controller.map().events().clone();
        let (commands, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(controller.run(rx, shutdown.clone()));

        load(&commands, "/data/a.tif").await;
        for _ in 0..5 {
            bus.emit(MapEvent::MoveEnd);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.cancel();
        let controller = handle.await.unwrap();

        // load: invalidate + first pass; then one debounced pass
        assert_eq!(controller.generation(), 3);
        assert_eq!(controller.stats().fetches_issued, 8);
        assert_eq!(controller.map().overlay_count(), 8);
        assert_eq!(backend.tile_requests().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_drive_params() {
        let backend = Arc::new(MockBackend::new());
        let controller = controller(backend.clone());
        let (commands, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(controller.run(rx, shutdown.clone()));

        load(&commands, "/data/a.tif").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        commands.send(ControllerCommand::SetOpacity(0.4)).await.unwrap();
        commands
            .send(ControllerCommand::SetBands(BandSelection::new(4, 3, 2).unwrap()))
            .await
            .unwrap();
        commands
            .send(ControllerCommand::SetResampling(ResamplingMethod::Nearest))
            .await
            .unwrap();
        // Rejected: raster has four bands
        commands
            .send(ControllerCommand::SetBands(BandSelection::new(9, 1, 1).unwrap()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        shutdown.cancel();
        let controller = handle.await.unwrap();

        let params = controller.params().unwrap();
        assert_eq!(params.bands(), BandSelection::new(4, 3, 2).unwrap());
        assert_eq!(params.resampling(), ResamplingMethod::Nearest);
        assert_eq!(controller.map().overlay_count(), 8);
        assert!(controller.map().overlays().all(|(_, o)| o.opacity == 0.4));

        let final_round: Vec<_> = backend
            .tile_requests()
            .into_iter()
            .filter(|r| r.resampling == ResamplingMethod::Nearest)
            .collect();
        assert_eq!(final_round.len(), 8);
        assert!(final_round.iter().all(|r| r.bands == BandSelection::new(4, 3, 2).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_command_empties_map() {
        let backend = Arc::new(MockBackend::new());
        let controller = controller(backend);
        let (commands, rx) = mpsc::channel(8);
        let handle = tokio::spawn(controller.run(rx, CancellationToken::new()));

        load(&commands, "/data/a.tif").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        commands.send(ControllerCommand::Close).await.unwrap();
        drop(commands);

        let controller = handle.await.unwrap();
        assert_eq!(controller.state(), ControllerState::Empty);
        assert_eq!(controller.map().overlay_count(), 0);
        assert!(controller.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_is_replied() {
        let backend = Arc::new(MockBackend::new());
        backend.set_info(Err(crate::backend::BackendError::Backend("File not found".into())));
        let controller = controller(backend);
        let (commands, rx) = mpsc::channel(8);
        let handle = tokio::spawn(controller.run(rx, CancellationToken::new()));

        let (reply, reply_rx) = oneshot::channel();
        commands
            .send(ControllerCommand::LoadRaster {
                path: "/missing.tif".into(),
                reply,
            })
            .await
            .unwrap();
        assert!(reply_rx.await.unwrap().is_err());

        drop(commands);
        let controller = handle.await.unwrap();
        assert_eq!(controller.state(), ControllerState::Empty);
    }
}
