pub const DEFAULT_BACKGROUND_IMAGE: &str = "/Afra_Art_Gallery-Yalda5.png";
pub const DEFAULT_BACKGROUND_OVERLAY_OPACITY: f32 = 0.31;
pub const DEFAULT_FLOATING_QUOTE_BG_COLOR: &str = "rgba(77, 57, 57, 0.58)";
pub const DEFAULT_PRESENTATION_OVERLAY_OPACITY: f32 = 0.35;

/// Used when no background image is configured.
pub const FALLBACK_BACKGROUND_GRADIENT: &str =
    "linear-gradient(to bottom right, rgb(88, 28, 135), rgb(190, 24, 93), rgb(126, 34, 206))";
pub const FALLBACK_PRESENTATION_GRADIENT: &str =
    "linear-gradient(to bottom right, rgb(17, 24, 39), rgb(31, 41, 55), rgb(17, 24, 39))";

pub const MOBILE_VIEWPORT_WIDTH: u32 = 768;
pub const DEFAULT_MOBILE_QUOTE_SLOTS: usize = 12;
pub const DEFAULT_DESKTOP_QUOTE_SLOTS: usize = 24;
pub const DEFAULT_ROTATION_INTERVAL_SECS: u64 = 30;

pub const FLOATING_MAX_COLUMNS: usize = 6;
pub const FLOATING_QUOTES_PER_COLUMN: usize = 4;
pub const FLOATING_DURATION_SECS: f32 = 40.0;
pub const FLOATING_DELAY_STEP_SECS: f32 = 2.0;
pub const FLOATING_START_Y_VH: f32 = 120.0;
pub const FLOATING_ROW_STEP_VH: f32 = 20.0;
pub const FLOATING_END_Y_VH: f32 = -20.0;
