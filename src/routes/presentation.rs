use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{floating::DeviceClass, pages, presentation::Presentation, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct SlideQuery {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    device: DeviceClass,
}

/// One quote full-screen; back to the wall when there is nothing to present
/// or the screen is too small for it.
pub async fn slide(State(state): State<Arc<AppState>>, Query(query): Query<SlideQuery>) -> Response {
    let live = state.live.read().await;

    let Some(snapshot) = live.view.snapshot() else {
        return Redirect::to("/wall").into_response();
    };

    if !Presentation::available(query.device, snapshot.len()) {
        return Redirect::to("/wall").into_response();
    }

    let presentation = Presentation::at(query.index, snapshot.len());
    match presentation.current(snapshot) {
        Some(quote) => Html(pages::presentation_page(
            quote,
            presentation,
            snapshot.len(),
            &state.config.theme,
        ))
        .into_response(),
        None => Redirect::to("/wall").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;
    use crate::routes::tests::{body_text, seed, test_state};

    #[tokio::test]
    async fn out_of_range_index_shows_the_last_quote() {
        let (state, backend) = test_state().await;
        seed(&state, &backend, &["A", "B"]).await;

        let query = SlideQuery {
            index: 9,
            ..Default::default()
        };
        let html = body_text(slide(State(state), Query(query)).await).await;

        assert!(html.contains("A says hi"));
        assert!(html.contains("2 / 2"));
    }

    #[tokio::test]
    async fn mobile_devices_go_back_to_the_wall() {
        let (state, backend) = test_state().await;
        seed(&state, &backend, &["A"]).await;

        let response = slide(
            State(state),
            Query(SlideQuery {
                index: 0,
                device: DeviceClass::Mobile,
            }),
        )
        .await;

        assert_eq!(response.headers()[LOCATION], "/wall");
    }

    #[tokio::test]
    async fn nothing_to_present_goes_back_to_the_wall() {
        let (state, _backend) = test_state().await;
        crate::routes::tests::wait_for_count(&state, 0).await;

        let response = slide(State(state), Query(SlideQuery::default())).await;

        assert_eq!(response.headers()[LOCATION], "/wall");
    }
}
