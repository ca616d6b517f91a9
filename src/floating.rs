use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    constants::presentation::{
        FLOATING_DELAY_STEP_SECS, FLOATING_DURATION_SECS, FLOATING_END_Y_VH,
        FLOATING_MAX_COLUMNS, FLOATING_QUOTES_PER_COLUMN, FLOATING_ROW_STEP_VH,
        FLOATING_START_Y_VH, MOBILE_VIEWPORT_WIDTH,
    },
    models::{
        quotes::{Quote, TextDirection},
        snapshot::Snapshot,
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceClass {
    pub fn from_viewport_width(width: u32) -> Self {
        if width < MOBILE_VIEWPORT_WIDTH {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    RiseAndFade,
    DriftAcross,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleSize {
    Small,
    Medium,
    Large,
}

impl BubbleSize {
    pub fn for_quote(quote: &str) -> Self {
        match quote.chars().count() {
            n if n > 200 => BubbleSize::Large,
            n if n > 100 => BubbleSize::Medium,
            _ => BubbleSize::Small,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Keyframe {
    /// Fraction of the loop, 0.0 to 1.0.
    pub at: f32,
    pub opacity: f32,
    pub x_vw: f32,
    pub y_vh: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Animation {
    pub motion: Motion,
    pub delay_secs: f32,
    pub duration_secs: f32,
    pub repeat: bool,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bubble {
    pub id: Uuid,
    pub full_name: String,
    pub quote: String,
    pub name_direction: TextDirection,
    pub quote_direction: TextDirection,
    pub size: BubbleSize,
    pub z_index: usize,
    pub animation: Animation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rotation {
    page_size: usize,
    current_page: usize,
    pages: usize,
}

impl Rotation {
    pub fn new(page_size: usize) -> Self {
        Rotation {
            page_size,
            current_page: 0,
            pages: 0,
        }
    }

    // keeps the current page when it still exists
    pub fn resize(&mut self, total: usize) {
        self.pages = if self.page_size == 0 {
            0
        } else {
            total.div_ceil(self.page_size)
        };
        self.current_page = self.current_page.min(self.pages.saturating_sub(1));
    }

    pub fn tick(&mut self) {
        if self.pages > 0 {
            self.current_page = (self.current_page + 1) % self.pages;
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn window<'a>(&self, snapshot: &'a Snapshot) -> &'a [Quote] {
        snapshot.page(self.current_page, self.page_size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rotations {
    mobile: Rotation,
    desktop: Rotation,
}

impl Rotations {
    pub fn new(mobile_slots: usize, desktop_slots: usize) -> Self {
        Rotations {
            mobile: Rotation::new(mobile_slots),
            desktop: Rotation::new(desktop_slots),
        }
    }

    pub fn resize(&mut self, total: usize) {
        self.mobile.resize(total);
        self.desktop.resize(total);
    }

    pub fn tick(&mut self) {
        self.mobile.tick();
        self.desktop.tick();
    }

    pub fn for_device(&self, device: DeviceClass) -> &Rotation {
        match device {
            DeviceClass::Mobile => &self.mobile,
            DeviceClass::Desktop => &self.desktop,
        }
    }
}

/// Places every quote of `visible` on screen.
pub fn layout(visible: &[Quote], motion: Motion) -> Vec<Bubble> {
    let total = visible.len();
    let columns = total
        .div_ceil(FLOATING_QUOTES_PER_COLUMN)
        .clamp(1, FLOATING_MAX_COLUMNS);

    visible
        .iter()
        .enumerate()
        .map(|(index, quote)| {
            let column = index % columns;
            let row = index / columns;

            // evenly spaced columns with a margin on both sides
            let x_vw = 100.0 / (columns as f32 + 1.0) * (column as f32 + 1.0);
            let y_start_vh = FLOATING_START_Y_VH + row as f32 * FLOATING_ROW_STEP_VH;

            Bubble {
                id: quote.id,
                full_name: quote.full_name.clone(),
                quote: quote.quote.clone(),
                name_direction: TextDirection::of(&quote.full_name),
                quote_direction: TextDirection::of(&quote.quote),
                size: BubbleSize::for_quote(&quote.quote),
                z_index: row,
                animation: Animation {
                    motion,
                    delay_secs: index as f32 * FLOATING_DELAY_STEP_SECS,
                    duration_secs: FLOATING_DURATION_SECS,
                    repeat: true,
                    keyframes: keyframes(motion, x_vw, y_start_vh, row),
                },
            }
        })
        .collect()
}

fn keyframes(motion: Motion, x_vw: f32, y_start_vh: f32, row: usize) -> Vec<Keyframe> {
    const FADE: [(f32, f32); 4] = [(0.0, 0.0), (0.1, 1.0), (0.9, 1.0), (1.0, 0.0)];

    FADE.iter()
        .map(|&(at, opacity)| match motion {
            Motion::RiseAndFade => Keyframe {
                at,
                opacity,
                x_vw,
                y_vh: y_start_vh + (FLOATING_END_Y_VH - y_start_vh) * at,
            },
            Motion::DriftAcross => Keyframe {
                at,
                opacity,
                x_vw: -20.0 + 140.0 * at,
                y_vh: (10.0 + row as f32 * FLOATING_ROW_STEP_VH) % 90.0,
            },
        })
        .collect()
}
