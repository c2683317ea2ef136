// API documentation: OpenAPI spec + Swagger UI

pub mod swagger_ui;

use axum::{
    extract::OriginalUri,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;

pub use swagger_ui::serve_swagger_ui;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contact Tables API",
        description = "Restaurant discovery and shared-table booking API",
        version = "0.1.0"
    ),
    paths(
        crate::handlers::restaurants::list_restaurants,
        crate::handlers::restaurants::get_restaurant_by_slug,
        crate::handlers::restaurants::update_own_profile,
        crate::handlers::tables::create_table,
        crate::handlers::tables::list_open_tables,
        crate::handlers::tables::join_table,
        crate::handlers::uploads::upload_images,
    ),
    tags(
        (name = "Restaurants", description = "Restaurant discovery and profile management"),
        (name = "ContactTables", description = "Shared-table offers and reservations")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI JSON at /docs/openapi.json
pub async fn serve_openapi_spec() -> Response {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            spec,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render OpenAPI spec: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Redirect /docs to /docs/ so relative asset paths resolve
pub async fn redirect_to_docs(original_uri: OriginalUri) -> impl IntoResponse {
    let mut path = original_uri.0.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, path)]).into_response()
}
