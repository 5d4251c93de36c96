mod settings;

pub use settings::{
    APP_VERSION_VAR, BASE_URL_VAR, CONFIG_FILENAME, DATA_DIR_VAR, DEFAULT_BASE_URL, Settings,
};
