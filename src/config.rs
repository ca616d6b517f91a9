use std::{fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use time::UtcOffset;

use crate::{
    constants::{
        presentation::{
            DEFAULT_BACKGROUND_IMAGE, DEFAULT_BACKGROUND_OVERLAY_OPACITY,
            DEFAULT_DESKTOP_QUOTE_SLOTS, DEFAULT_FLOATING_QUOTE_BG_COLOR,
            DEFAULT_MOBILE_QUOTE_SLOTS, DEFAULT_PRESENTATION_OVERLAY_OPACITY,
            DEFAULT_ROTATION_INTERVAL_SECS, FALLBACK_BACKGROUND_GRADIENT,
            FALLBACK_PRESENTATION_GRADIENT,
        },
        DEFAULT_QUOTE_MAX_LENGTH, NAME_MAX_LENGTH, QUOTE_MAX_LENGTH_RANGE,
    },
    floating::Motion,
    models::quotes::Limits,
};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    /// Served for any path no route claims, e.g. the background images.
    pub static_dir: PathBuf,
    pub limits: Limits,
    /// Offset the wall's "Today"/"Yesterday" labels are computed in.
    pub display_offset: UtcOffset,
    pub theme: Theme,
    pub floating: FloatingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    /// `None` falls back to a gradient.
    pub background_image: Option<String>,
    pub background_overlay_opacity: f32,
    pub floating_quote_bg_color: String,
    /// An image path or a CSS gradient; `None` falls back to a dark gradient.
    pub presentation_background: Option<String>,
    pub presentation_overlay_opacity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatingConfig {
    pub mobile_slots: usize,
    pub desktop_slots: usize,
    pub rotation_interval: Duration,
    pub motion: Motion,
}

impl Config {
    /// `local_offset` is the process's local offset if it could be read before
    /// any threads were started.
    pub fn from_env(local_offset: Option<UtcOffset>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), local_offset)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        local_offset: Option<UtcOffset>,
    ) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("missing DATABASE_URL")?;

        let bind_address = lookup("QUOTEWALL_BIND")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
            .parse()
            .context("invalid QUOTEWALL_BIND")?;

        let static_dir = PathBuf::from(
            lookup("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        );

        let quote_max = match try_load(&lookup, "QUOTE_MAX_LENGTH", DEFAULT_QUOTE_MAX_LENGTH) {
            n if QUOTE_MAX_LENGTH_RANGE.contains(&n) => n,
            n => {
                tracing::warn!(
                    "QUOTE_MAX_LENGTH {n} is outside {QUOTE_MAX_LENGTH_RANGE:?}, using default: {DEFAULT_QUOTE_MAX_LENGTH}"
                );
                DEFAULT_QUOTE_MAX_LENGTH
            }
        };
        let limits = Limits {
            name_max: NAME_MAX_LENGTH,
            quote_max,
        };

        let theme = Theme {
            background_image: optional_path(
                lookup("BACKGROUND_IMAGE"),
                Some(DEFAULT_BACKGROUND_IMAGE),
            ),
            background_overlay_opacity: opacity(try_load(
                &lookup,
                "BACKGROUND_OVERLAY_OPACITY",
                DEFAULT_BACKGROUND_OVERLAY_OPACITY,
            )),
            floating_quote_bg_color: lookup("FLOATING_QUOTE_BG_COLOR")
                .unwrap_or_else(|| DEFAULT_FLOATING_QUOTE_BG_COLOR.to_string()),
            presentation_background: optional_path(
                lookup("PRESENTATION_BACKGROUND"),
                Some(DEFAULT_BACKGROUND_IMAGE),
            ),
            presentation_overlay_opacity: opacity(try_load(
                &lookup,
                "PRESENTATION_OVERLAY_OPACITY",
                DEFAULT_PRESENTATION_OVERLAY_OPACITY,
            )),
        };

        let motion = match lookup("FLOATING_MOTION").as_deref() {
            None | Some("rise") => Motion::RiseAndFade,
            Some("drift") => Motion::DriftAcross,
            Some(other) => {
                tracing::warn!("invalid FLOATING_MOTION {other:?}, using rise");
                Motion::RiseAndFade
            }
        };

        let floating = FloatingConfig {
            mobile_slots: try_load(&lookup, "MOBILE_QUOTE_SLOTS", DEFAULT_MOBILE_QUOTE_SLOTS)
                .max(1),
            desktop_slots: try_load(&lookup, "DESKTOP_QUOTE_SLOTS", DEFAULT_DESKTOP_QUOTE_SLOTS)
                .max(1),
            rotation_interval: Duration::from_secs(
                try_load(&lookup, "ROTATION_INTERVAL_SECS", DEFAULT_ROTATION_INTERVAL_SECS).max(1),
            ),
            motion,
        };

        let display_offset = lookup("DISPLAY_UTC_OFFSET")
            .and_then(|hours| {
                parse_offset_hours(&hours)
                    .inspect_err(|e| tracing::warn!("invalid DISPLAY_UTC_OFFSET {hours:?}: {e}"))
                    .ok()
            })
            .or(local_offset)
            .unwrap_or_else(|| {
                tracing::warn!("could not determine the local utc offset, displaying times in utc");
                UtcOffset::UTC
            });

        Ok(Config {
            database_url,
            bind_address,
            static_dir,
            limits,
            display_offset,
            theme,
            floating,
        })
    }
}

impl Theme {
    pub fn background_css(&self) -> String {
        match &self.background_image {
            Some(image) => css_background(image),
            None => FALLBACK_BACKGROUND_GRADIENT.to_string(),
        }
    }

    pub fn presentation_background_css(&self) -> String {
        match &self.presentation_background {
            Some(background) => css_background(background),
            None => FALLBACK_PRESENTATION_GRADIENT.to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background_image: Some(DEFAULT_BACKGROUND_IMAGE.to_string()),
            background_overlay_opacity: DEFAULT_BACKGROUND_OVERLAY_OPACITY,
            floating_quote_bg_color: DEFAULT_FLOATING_QUOTE_BG_COLOR.to_string(),
            presentation_background: Some(DEFAULT_BACKGROUND_IMAGE.to_string()),
            presentation_overlay_opacity: DEFAULT_PRESENTATION_OVERLAY_OPACITY,
        }
    }
}

impl Default for FloatingConfig {
    fn default() -> Self {
        FloatingConfig {
            mobile_slots: DEFAULT_MOBILE_QUOTE_SLOTS,
            desktop_slots: DEFAULT_DESKTOP_QUOTE_SLOTS,
            rotation_interval: Duration::from_secs(DEFAULT_ROTATION_INTERVAL_SECS),
            motion: Motion::RiseAndFade,
        }
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(value) = lookup(key) else {
        tracing::debug!("{key} not set, using default: {default}");
        return default;
    };

    value.trim().parse().unwrap_or_else(|e| {
        tracing::warn!("invalid {key} value {value:?}: {e}, using default: {default}");
        default
    })
}

/// An empty value explicitly disables the image.
fn optional_path(value: Option<String>, default: Option<&str>) -> Option<String> {
    match value {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value.trim().to_string()),
        None => default.map(str::to_string),
    }
}

fn opacity(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }

    value.clamp(0.0, 1.0)
}

fn css_background(value: &str) -> String {
    if value.contains("gradient(") {
        value.to_string()
    } else {
        format!("url(\"{}\") center / cover no-repeat", value.replace('"', "%22"))
    }
}

/// Whole or fractional hours, e.g. `-5` or `3.5`.
fn parse_offset_hours(value: &str) -> anyhow::Result<UtcOffset> {
    let hours: f64 = value.trim().parse()?;
    anyhow::ensure!(hours.is_finite(), "offset must be finite");

    let seconds = (hours * 3600.0).round() as i32;
    Ok(UtcOffset::from_whole_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use time::macros::offset;

    use super::*;

    fn load(vars: &[(&str, &str)], local: Option<UtcOffset>) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|key| vars.get(key).cloned(), local)
    }

    #[test]
    fn database_url_is_required() {
        assert!(load(&[], None).is_err());
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:")], None).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.theme, Theme::default());
        assert_eq!(config.floating, FloatingConfig::default());
        assert_eq!(config.display_offset, UtcOffset::UTC);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(
            &[
                ("DATABASE_URL", "sqlite://quotes.db"),
                ("QUOTE_MAX_LENGTH", "280"),
                ("BACKGROUND_IMAGE", ""),
                ("BACKGROUND_OVERLAY_OPACITY", "1.7"),
                ("PRESENTATION_BACKGROUND", "linear-gradient(#000, #111)"),
                ("MOBILE_QUOTE_SLOTS", "6"),
                ("ROTATION_INTERVAL_SECS", "0"),
                ("FLOATING_MOTION", "drift"),
                ("DISPLAY_UTC_OFFSET", "3.5"),
            ],
            Some(offset!(-5)),
        )
        .unwrap();

        assert_eq!(config.limits.quote_max, 280);
        assert_eq!(config.theme.background_image, None);
        assert_eq!(config.theme.background_css(), FALLBACK_BACKGROUND_GRADIENT);
        assert_eq!(config.theme.background_overlay_opacity, 1.0);
        assert_eq!(
            config.theme.presentation_background_css(),
            "linear-gradient(#000, #111)"
        );
        assert_eq!(config.floating.mobile_slots, 6);
        assert_eq!(config.floating.rotation_interval, Duration::from_secs(1));
        assert_eq!(config.floating.motion, Motion::DriftAcross);
        assert_eq!(config.display_offset, offset!(+3:30));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = load(
            &[
                ("DATABASE_URL", "sqlite::memory:"),
                ("QUOTE_MAX_LENGTH", "lots"),
                ("FLOATING_MOTION", "spin"),
                ("DISPLAY_UTC_OFFSET", "east"),
            ],
            Some(offset!(+1)),
        )
        .unwrap();

        assert_eq!(config.limits.quote_max, DEFAULT_QUOTE_MAX_LENGTH);
        assert_eq!(config.floating.motion, Motion::RiseAndFade);
        assert_eq!(config.display_offset, offset!(+1));
    }

    #[test]
    fn unusable_quote_lengths_fall_back() {
        for value in ["0", "99", "1000000"] {
            let config = load(
                &[("DATABASE_URL", "sqlite::memory:"), ("QUOTE_MAX_LENGTH", value)],
                None,
            )
            .unwrap();

            assert_eq!(config.limits.quote_max, DEFAULT_QUOTE_MAX_LENGTH, "{value}");
        }

        let config = load(
            &[("DATABASE_URL", "sqlite::memory:"), ("QUOTE_MAX_LENGTH", "400")],
            None,
        )
        .unwrap();
        assert_eq!(config.limits.quote_max, 400);
    }

    #[test]
    fn image_backgrounds_are_wrapped_in_url() {
        assert_eq!(
            Theme::default().background_css(),
            "url(\"/Afra_Art_Gallery-Yalda5.png\") center / cover no-repeat"
        );
    }
}
