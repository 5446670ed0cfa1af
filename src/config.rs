use crate::event::EventMask;
use crate::error::Error;
use crate::frame::FrameNumber;
use crate::Result;
use serde::Deserialize;
use std::path::Path;



pub const DEFAULT_FRAMES: u32 = 50;
// One exposure end, one image and one move per frame.
pub const DEFAULT_LOG_CAPACITY: usize = DEFAULT_FRAMES as usize * 3;
pub const DEFAULT_SEED: u64 = 0;



#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SessionConfigFile {
    frames: Option<u32>,
    seed: Option<u64>,
    monitor: Option<MonitorConfigFile>,
    loss: Option<LossConfigFile>
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MonitorConfigFile {
    initial_frame: Option<FrameNumber>,
    log_capacity: Option<usize>,
    events: Option<Vec<String>>,
    strict_image_sequence: Option<bool>
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LossConfigFile {
    exposure_end_drop: Option<f64>,
    image_drop: Option<f64>,
    duplicate: Option<f64>,
    late_exposure_end: Option<f64>,
    overtrigger: Option<f64>
}



#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub initial_frame: FrameNumber,
    pub log_capacity: usize,
    pub events: EventMask,
    /// Treat a lost image like a lost exposure end and stop the session.
    pub strict_image_sequence: bool
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_frame: 0,
            log_capacity: DEFAULT_LOG_CAPACITY,
            events: EventMask::default(),
            strict_image_sequence: false
        }
    }
}



/// Probabilities used by the synthetic camera. All of them must be in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossConfig {
    pub exposure_end_drop: f64,
    pub image_drop: f64,
    pub duplicate: f64,
    pub late_exposure_end: f64,
    pub overtrigger: f64
}

impl LossConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("exposure_end_drop", self.exposure_end_drop),
            ("image_drop", self.image_drop),
            ("duplicate", self.duplicate),
            ("late_exposure_end", self.late_exposure_end),
            ("overtrigger", self.overtrigger)
        ];

        for (name, p) in fields {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Config(format!("loss.{name} must be within [0, 1], got {p}")));
            }
        }

        Ok(())
    }
}



#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub frames: u32,
    pub seed: u64,
    pub monitor: MonitorConfig,
    pub loss: LossConfig
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            seed: DEFAULT_SEED,
            monitor: MonitorConfig::default(),
            loss: LossConfig::default()
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;

        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: SessionConfigFile = toml::from_str(raw)
            .map_err(|e| Error::Config(e.to_string()))?;

        let defaults = Self::default();
        let monitor_file = file.monitor.unwrap_or_default();
        let loss_file = file.loss.unwrap_or_default();

        let events = match monitor_file.events {
            Some(names) => EventMask::from_names(names.as_slice())?,
            None => defaults.monitor.events
        };

        let cfg = Self {
            frames: file.frames.unwrap_or(defaults.frames),
            seed: file.seed.unwrap_or(defaults.seed),
            monitor: MonitorConfig {
                initial_frame: monitor_file.initial_frame.unwrap_or(defaults.monitor.initial_frame),
                log_capacity: monitor_file.log_capacity.unwrap_or(defaults.monitor.log_capacity),
                events,
                strict_image_sequence: monitor_file.strict_image_sequence
                    .unwrap_or(defaults.monitor.strict_image_sequence)
            },
            loss: LossConfig {
                exposure_end_drop: loss_file.exposure_end_drop.unwrap_or(0.0),
                image_drop: loss_file.image_drop.unwrap_or(0.0),
                duplicate: loss_file.duplicate.unwrap_or(0.0),
                late_exposure_end: loss_file.late_exposure_end.unwrap_or(0.0),
                overtrigger: loss_file.overtrigger.unwrap_or(0.0)
            }
        };

        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.loss.validate()
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = SessionConfig::from_toml_str("").unwrap();

        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.monitor.log_capacity, 150);
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let cfg = SessionConfig::from_toml_str(r#"
            frames = 500
            [monitor]
            initial_frame = 65530
            events = ["ExposureEnd", "ImageReceived"]
            [loss]
            image_drop = 0.25
        "#).unwrap();

        assert_eq!(cfg.frames, 500);
        assert_eq!(cfg.seed, DEFAULT_SEED);
        assert_eq!(cfg.monitor.initial_frame, 65530);
        assert_eq!(cfg.monitor.events, EventMask::EXPOSURE_END | EventMask::IMAGE_RECEIVED);
        assert_eq!(cfg.loss.image_drop, 0.25);
        assert_eq!(cfg.loss.duplicate, 0.0);
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let err = SessionConfig::from_toml_str("[loss]\nduplicate = 1.5\n").unwrap_err();

        assert!(matches!(err, Error::Config(ref msg) if msg.contains("loss.duplicate")));
    }

    #[test]
    fn rejects_unknown_keys_and_events() {
        assert!(SessionConfig::from_toml_str("bogus = 1").is_err());
        assert!(SessionConfig::from_toml_str("[monitor]\nevents = [\"Nope\"]").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed = 42\n[monitor]\nstrict_image_sequence = true").unwrap();

        let cfg = SessionConfig::load(file.path()).unwrap();

        assert_eq!(cfg.seed, 42);
        assert!(cfg.monitor.strict_image_sequence);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionConfig::load(&dir.path().join("absent.toml")).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
