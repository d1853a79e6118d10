use {
    crate::{error::Error, motion::Motion},
    std::{
        fs::File,
        io::{BufReader, Read},
        path::Path,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("{source}")]
    Bvh {
        #[from]
        source: bvh_anim::errors::LoadError,
    },

    #[error("File has no root joint")]
    MissingRoot,

    #[error("Frame {frame} has no value for a channel of `{joint}`")]
    MissingValue { frame: usize, joint: String },

    #[error("File declares {declared} frames, only {available} are present")]
    FrameCount { declared: usize, available: usize },

    #[error("Frame time must be positive, got {frame_time}")]
    InvalidFrameTime { frame_time: f64 },

    #[error("{source}")]
    Animate {
        #[from]
        source: Error,
    },
}

/// Producer of a populated [`Motion`].
///
/// Implementations must list postures in frame order, provide one local
/// rotation per skeleton joint in index order and set the root position of
/// every posture.
pub trait Loader {
    fn load(&self, reader: &mut dyn Read) -> Result<Motion, LoadError>;

    /// Loads from a file and names the motion after the file stem.
    fn load_path(&self, path: &Path) -> Result<Motion, LoadError> {
        let span = tracing::debug_span!("load_path", path = %path.display());
        let _enter = span.enter();

        let mut reader = BufReader::new(File::open(path)?);
        let mut motion = self.load(&mut reader)?;
        if let Some(stem) = path.file_stem() {
            motion.set_name(stem.to_string_lossy());
        }

        tracing::debug!(
            "Loaded {} frames at {} fps",
            motion.len(),
            motion.fps()
        );
        Ok(motion)
    }
}
