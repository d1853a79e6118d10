use {
    animate::ContactThresholds,
    color_eyre::Report,
    eyre::WrapErr,
    std::path::{Path, PathBuf},
};

const DEFAULT_PATH: &str = "./mocap.ron";

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Multiplier for BVH offsets and root translation.
    pub scale: f64,

    /// Keep the root `OFFSET` of loaded files.
    pub apply_root_offset: bool,

    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,

    pub contact: ContactThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scale: 1.0,
            apply_root_offset: false,
            log_filter: "info".to_owned(),
            contact: ContactThresholds::default(),
        }
    }
}

impl Config {
    /// Loads from `MOCAP_CONFIG_PATH` or `./mocap.ron`.
    ///
    /// A missing file at the default path yields the default config, a
    /// missing file named by the variable is an error.
    pub fn load_default() -> Result<Self, Report> {
        match std::env::var("MOCAP_CONFIG_PATH") {
            Ok(path) => Self::load(&PathBuf::from(path)),
            Err(_) => {
                let path = Path::new(DEFAULT_PATH);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, Report> {
        let file = std::fs::File::open(path).wrap_err_with(|| {
            format!("Failed to open config `{}`", path.display())
        })?;
        let config = ron::de::from_reader(file).wrap_err_with(|| {
            format!("Failed to parse config `{}`", path.display())
        })?;
        Ok(config)
    }
}
