use actix_web::{HttpResponse, Responder, post, web};

use crate::dto::api::SearchRequest;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::search::cursor::HmacCursorSigner;
use crate::services::search::{PageBounds, SearchCatalog, search};

#[post("/v1/hubs/{hub_id}/clients/search")]
pub async fn api_v1_search_clients(
    hub_id: web::Path<i32>,
    request: web::Json<SearchRequest>,
    repo: web::Data<DieselRepository>,
    signer: web::Data<HmacCursorSigner>,
    catalog: web::Data<SearchCatalog>,
    bounds: web::Data<PageBounds>,
) -> impl Responder {
    let hub_id = hub_id.into_inner();

    match search(
        repo.clients(hub_id),
        signer.get_ref(),
        &catalog.clients,
        **bounds,
        request.into_inner(),
    ) {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => error_response(&e),
    }
}

#[post("/v1/hubs/{hub_id}/managers/search")]
pub async fn api_v1_search_managers(
    hub_id: web::Path<i32>,
    request: web::Json<SearchRequest>,
    repo: web::Data<DieselRepository>,
    signer: web::Data<HmacCursorSigner>,
    catalog: web::Data<SearchCatalog>,
    bounds: web::Data<PageBounds>,
) -> impl Responder {
    let hub_id = hub_id.into_inner();

    match search(
        repo.managers(hub_id),
        signer.get_ref(),
        &catalog.managers,
        **bounds,
        request.into_inner(),
    ) {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => error_response(&e),
    }
}
