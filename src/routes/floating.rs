use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    floating::{self, Bubble, DeviceClass},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct FloatingQuery {
    #[serde(default)]
    device: DeviceClass,
    /// Viewport width in CSS pixels; takes precedence over `device`.
    width: Option<u32>,
}

impl FloatingQuery {
    fn device(&self) -> DeviceClass {
        self.width
            .map(DeviceClass::from_viewport_width)
            .unwrap_or(self.device)
    }
}

#[derive(Debug, Serialize)]
pub struct FloatingLayer {
    pub device: DeviceClass,
    pub page: usize,
    pub pages: usize,
    pub bubble_color: String,
    pub bubbles: Vec<Bubble>,
}

/// The bubbles for the rotation page currently showing on `device`. Empty
/// until the first snapshot arrives.
pub async fn layout(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FloatingQuery>,
) -> Json<FloatingLayer> {
    let device = query.device();
    let live = state.live.read().await;
    let rotation = live.rotations.for_device(device);

    let bubbles = live
        .view
        .snapshot()
        .map(|snapshot| floating::layout(rotation.window(snapshot), state.config.floating.motion))
        .unwrap_or_default();

    Json(FloatingLayer {
        device,
        page: rotation.current_page(),
        pages: rotation.pages(),
        bubble_color: state.config.theme.floating_quote_bg_color.clone(),
        bubbles,
    })
}
