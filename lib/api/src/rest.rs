use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use viaprox_core::options::{DEFAULT_LIMIT, DEFAULT_PAGE};
use viaprox_core::{Error, MatchCriteria, SearchOptions};
use viaprox_search::SearchOrchestrator;

#[derive(Deserialize)]
struct SearchRequest {
    address: String,
    #[serde(default)]
    options: SearchOptions,
}

#[derive(Deserialize)]
struct SimilarRequest {
    target: String,
    #[serde(default)]
    criteria: MatchCriteria,
}

#[derive(Deserialize)]
struct ParseRequest {
    address: String,
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    semantic_configured: bool,
}

type Orchestrator = web::Data<Arc<SearchOrchestrator>>;

pub struct RestApi;

impl RestApi {
    pub async fn start(orchestrator: Arc<SearchOrchestrator>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(orchestrator.clone()))
                .configure(Self::routes)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Route table, shared by the server and in-process tests.
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/health", web::get().to(health))
            .route("/addresses", web::get().to(list_addresses))
            .route("/addresses/search", web::post().to(search_addresses))
            .route("/addresses/similar", web::post().to(similar_addresses))
            .route("/addresses/parse", web::post().to(parse_address));
    }
}

fn error_response(e: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        Error::QueryInvalid(_) => {
            warn!(error = %e, "rejected request");
            HttpResponse::BadRequest().json(body)
        }
        _ => {
            error!(error = %e, "request failed");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

async fn health(orchestrator: Orchestrator) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(Health {
        status: "ok",
        semantic_configured: orchestrator.semantic_configured(),
    }))
}

async fn search_addresses(orchestrator: Orchestrator, req: web::Json<SearchRequest>) -> ActixResult<HttpResponse> {
    match orchestrator.search_nearby_addresses(&req.address, &req.options).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn similar_addresses(orchestrator: Orchestrator, req: web::Json<SimilarRequest>) -> ActixResult<HttpResponse> {
    let target = orchestrator.parse(&req.target);
    match orchestrator.find_similar_addresses(&target, &req.criteria).await {
        Ok(found) => Ok(HttpResponse::Ok().json(found)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn parse_address(orchestrator: Orchestrator, req: web::Json<ParseRequest>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(orchestrator.parse(&req.address)))
}

async fn list_addresses(orchestrator: Orchestrator, query: web::Query<ListQuery>) -> ActixResult<HttpResponse> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    match orchestrator.list_addresses(page, limit).await {
        Ok(listing) => Ok(HttpResponse::Ok().json(listing)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use viaprox_core::{AddressParser, AddressRecord, Gazetteer};
    use viaprox_storage::MemoryStore;

    fn orchestrator() -> Arc<SearchOrchestrator> {
        let parser = AddressParser::default();
        let store = MemoryStore::from_records(
            ["cl 152b 73 36 bogotá", "cl 152b 75 10 bogotá", "kr 7 72 10 cali"]
                .iter()
                .enumerate()
                .map(|(i, raw)| AddressRecord::new(format!("a{}", i), *raw).with_structure(&parser.parse(raw))),
        );
        Arc::new(SearchOrchestrator::new(Arc::new(Gazetteer::default()), Arc::new(store)))
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(orchestrator()))
                    .configure(RestApi::routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_reports_structured_only() {
        let app = app!();
        let resp: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["semanticConfigured"], false);
    }

    #[actix_web::test]
    async fn test_search_falls_back_to_structured() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/addresses/search")
            .set_json(serde_json::json!({
                "address": "CL 152B 73 36 Bogotá",
                "options": { "searchRadius": 5 }
            }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["metadata"]["source"], "structured");
        assert_eq!(resp["metadata"]["totalFound"], 2);
        assert_eq!(resp["normalizedAddress"]["viaCode"], "cl");
        assert_eq!(resp["matches"][0]["address"]["id"], "a0");
    }

    #[actix_web::test]
    async fn test_invalid_limit_is_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/addresses/search")
            .set_json(serde_json::json!({
                "address": "cl 152b 73 36",
                "options": { "limit": 500 }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let listing = test::TestRequest::get().uri("/addresses?page=0").to_request();
        assert_eq!(test::call_service(&app, listing).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_listing_and_parse() {
        let app = app!();
        let listing: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/addresses?page=1&limit=2").to_request(),
        )
        .await;
        assert_eq!(listing["total"], 3);
        assert_eq!(listing["data"].as_array().map(Vec::len), Some(2));

        let parsed: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/addresses/parse")
                .set_json(serde_json::json!({ "address": "ac 68 sur 70 70" }))
                .to_request(),
        )
        .await;
        assert_eq!(parsed["viaCode"], "av");
        assert_eq!(parsed["quadrant"], "sur");
    }

    #[actix_web::test]
    async fn test_similar_addresses() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/addresses/similar")
            .set_json(serde_json::json!({
                "target": "cl 152b 74 00 bogotá",
                "criteria": { "viaCodeMatch": true, "numberRangeMatch": true }
            }))
            .to_request();
        let found: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(found.as_array().map(Vec::len), Some(2));
    }
}
