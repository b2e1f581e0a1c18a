// src/handlers/tracking.rs
//
// Endpoints públicos de rastreio, chaveados pelo token opaco. Nunca devolvem
// erro ao navegador: pixel sempre responde, clique sempre redireciona —
// inclusive quando o token não resolve ou o storage falha.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::AppState;

// GIF transparente 1x1.
const PIXEL: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0xF0, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

// GET /t/o/{token}
pub async fn open_pixel(State(app_state): State<AppState>, Path(token): Path<String>) -> Response {
    if let Err(e) = app_state.tracking_service.record_open(&token).await {
        // Fail open: o erro fica no log, o navegador recebe o pixel normal.
        tracing::warn!("Falha ao registrar abertura {}: {}", token, e);
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, proxy-revalidate",
            ),
        ],
        PIXEL,
    )
        .into_response()
}

// GET /t/c/{token}
pub async fn click_redirect(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    let target = match app_state.tracking_service.record_click(&token).await {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!("Falha ao registrar clique {}: {}", token, e);
            app_state.tracking_service.default_landing_url().to_string()
        }
    };

    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}
