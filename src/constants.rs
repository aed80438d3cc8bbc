//! Central Configuration Constants
//!
//! Single source of truth for evaluation defaults.
//! `EvalConfig` falls back to these when neither env nor CLI sets a value.

/// Default dataset root (one sub-directory per device)
pub const DEFAULT_DATA_DIR: &str = "./data/UCI-MLR";

/// Default model checkpoint
pub const DEFAULT_MODEL_PATH: &str = "./training/model.json";

/// Feature width of one N-BaIoT traffic row
pub const N_BAIOT_FEATURE_COUNT: usize = 115;

/// Batch size the threshold's standard error is scaled by
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Rows taken from the head of each attack CSV
pub const DEFAULT_ATTACK_ROWS_PER_FILE: usize = 500;

/// Benign rows from this fraction onward form the holdout
pub const DEFAULT_HOLDOUT_START: f64 = 2.0 / 3.0;

/// Threshold multipliers evaluated per run
pub const DEFAULT_K_VALUES: &[f64] = &[0.0, 1.0, 2.0];

/// Devices of the N-BaIoT capture
pub const DEFAULT_DEVICES: &[&str] = &[
    "Danmini_Doorbell",
    "Ecobee_Thermostat",
    "Ennio_Doorbell",
    "Philips_B120N10_Baby_Monitor",
    "Provision_PT_737E_Security_Camera",
    "Provision_PT_838_Security_Camera",
    "Samsung_SNH_1011_N_Webcam",
    "SimpleHome_XCS7_1002_WHT_Security_Camera",
    "SimpleHome_XCS7_1003_WHT_Security_Camera",
];

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "fediot-eval";
