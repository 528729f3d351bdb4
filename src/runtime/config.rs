use std::env;

use tracing::warn;

/// Upper bound on continuation frames before a run faults with a stack
/// overflow.
pub const DEFAULT_MAX_FRAMES: usize = 1 << 17; // 131,072 frames

const TRACE_VAR: &str = "CAIRN_TRACE";
const MAX_FRAMES_VAR: &str = "CAIRN_MAX_FRAMES";

/// Tunables of a runtime session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Emit a `trace!` event for every section the machine executes.
    pub trace: bool,
    pub max_frames: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl RuntimeConfig {
    /// Reads `CAIRN_TRACE` and `CAIRN_MAX_FRAMES`, falling back to defaults
    /// for unset or unparsable values.
    pub fn from_env() -> Self {
        let trace = env::var(TRACE_VAR).ok();
        let max_frames = env::var(MAX_FRAMES_VAR).ok();
        Self::from_vars(trace.as_deref(), max_frames.as_deref())
    }

    /// Builds a config from raw variable values as `from_env` reads them.
    pub fn from_vars(trace: Option<&str>, max_frames: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(value) = trace {
            config.trace = parse_flag(value);
        }
        if let Some(value) = max_frames {
            match parse_frame_limit(value) {
                Some(n) => config.max_frames = n,
                None => warn!(
                    variable = MAX_FRAMES_VAR,
                    value = %value,
                    "ignoring invalid frame limit"
                ),
            }
        }
        config
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}

/// A positive frame count; zero would fault on the first call.
fn parse_frame_limit(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|&n| n > 0)
}
