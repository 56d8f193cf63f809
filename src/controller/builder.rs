use super::FlightModeController;
use crate::maneuver::Maneuver;
use crate::streamer::SetpointSink;
use crate::{Config, Error, FrameTransformer};
use std::sync::Arc;

pub struct Builder<K> {
    sink: Option<Arc<K>>,
    config: Config,
    maneuvers: Vec<Maneuver>,
    transformer: FrameTransformer,
}

impl<K> Default for Builder<K> {
    fn default() -> Self {
        Self {
            sink: None,
            config: Config::default(),
            maneuvers: Vec::new(),
            transformer: FrameTransformer::default(),
        }
    }
}

impl<K> Builder<K>
where
    K: SetpointSink,
{
    pub fn sink(self, sink: K) -> Self {
        self.shared_sink(Arc::new(sink))
    }

    pub fn shared_sink(mut self, sink: Arc<K>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn rate_hz(mut self, hz: f32) -> Self {
        self.config.rate_hz = hz;
        self
    }

    pub fn max_speed(mut self, speed: f32) -> Self {
        self.config.max_speed = speed;
        self
    }

    pub fn min_speed(mut self, speed: f32) -> Self {
        self.config.min_speed = speed;
        self
    }

    /// Append a maneuver to run on entering offboard mode.
    pub fn maneuver(mut self, maneuver: Maneuver) -> Self {
        self.maneuvers.push(maneuver);
        self
    }

    pub fn maneuvers(mut self, maneuvers: impl IntoIterator<Item = Maneuver>) -> Self {
        self.maneuvers.extend(maneuvers);
        self
    }

    pub fn transformer(mut self, transformer: FrameTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn build(self) -> Result<FlightModeController<K>, Error> {
        self.config.validate()?;
        let sink = self.sink.ok_or(Error::MissingSink)?;

        Ok(FlightModeController::new(
            self.config,
            sink,
            self.maneuvers.into(),
            self.transformer,
        ))
    }
}
