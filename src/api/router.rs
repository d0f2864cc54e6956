//! HTTP router.
//!
//! JSON endpoints live under `/api/`; everything else is served from the
//! static directory, falling back to `index.html` for client-side routes.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use std::path::Path;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{medications, patients, prescriptions, system};
use crate::api::types::ApiContext;

/// Builds the full application router.
pub fn app_router(ctx: ApiContext, static_dir: &Path) -> Router {
    let api = Router::new()
        .route("/pacientes", get(patients::list).post(patients::create))
        .route("/pacientes/export", get(patients::export))
        .route("/pacientes/import", post(patients::import))
        .route("/pacientes/:id", put(patients::update).delete(patients::remove))
        .route("/medicamentos", get(medications::list).post(medications::create))
        .route("/medicamentos/export", get(medications::export))
        .route("/medicamentos/import", post(medications::import))
        .route("/medicamentos/seed", post(medications::seed))
        .route(
            "/medicamentos/:id",
            put(medications::update).delete(medications::remove),
        )
        .route("/receitas", get(prescriptions::list).post(prescriptions::create))
        .route("/receitas/generate", post(prescriptions::generate))
        .route("/receitas/:id", axum::routing::delete(prescriptions::remove))
        .route("/receitas/:id/pdf", get(prescriptions::pdf))
        .route("/shutdown", post(system::shutdown))
        .with_state(ctx)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let assets = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api)
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;

    struct TestApp {
        router: Router,
        ctx: ApiContext,
        _dir: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join("index.html"), "<h1>Receituário</h1>").unwrap();

        let config = AppConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            db_path: dir.path().join("receitas.db"),
            static_dir: static_dir.clone(),
        };
        let ctx = ApiContext::new(&config);
        TestApp {
            router: app_router(ctx.clone(), &static_dir),
            ctx,
            _dir: dir,
        }
    }

    impl TestApp {
        async fn send(&self, req: Request<Body>) -> Response {
            self.router.clone().oneshot(req).await.unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn json(&self, method: &str, uri: &str, body: Value) -> Response {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }

        async fn create_patient(&self, name: &str, cpf: &str) -> i64 {
            let resp = self
                .json("POST", "/api/pacientes", json!({"nome_completo": name, "cpf": cpf}))
                .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            body_json(resp).await["data"]["id"].as_i64().unwrap()
        }

        async fn create_medication(&self, name: &str) -> i64 {
            let resp = self
                .json(
                    "POST",
                    "/api/medicamentos",
                    json!({"denominacao_generica": name, "concentracao": "50 mg", "apresentacao": "Comprimidos"}),
                )
                .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            body_json(resp).await["data"]["id"].as_i64().unwrap()
        }
    }

    async fn body_bytes(resp: Response) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn body_json(resp: Response) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    // -- Patients -----------------------------------------------------------

    #[tokio::test]
    async fn empty_patient_list() {
        let app = test_app();
        let resp = app.get("/api/pacientes").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        let json = body_json(resp).await;
        assert_eq!(json, json!({"success": true, "data": [], "total": 0}));
    }

    #[tokio::test]
    async fn patient_crud_round() {
        let app = test_app();
        let id = app.create_patient("Maria Souza", "123").await;

        let resp = app.get("/api/pacientes?search=maria").await;
        let json = body_json(resp).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["data"][0]["nome_completo"], "Maria Souza");

        let resp = app
            .json(
                "PUT",
                &format!("/api/pacientes/{id}"),
                json!({"nome_completo": "Maria Souza Lima", "cpf": "123", "data_nascimento": "1980-05-20"}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["data_nascimento"], "1980-05-20");

        let resp = app
            .send(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/pacientes/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(app.get("/api/pacientes").await).await["total"], 0);
    }

    #[tokio::test]
    async fn patient_validation_errors() {
        let app = test_app();
        let resp = app.json("POST", "/api/pacientes", json!({"cpf": "1"})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Nome é obrigatório");

        app.create_patient("Ana", "999").await;
        let resp = app
            .json("POST", "/api/pacientes", json!({"nome_completo": "Outra", "cpf": "999"}))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "CPF já cadastrado");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/pacientes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.send(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn update_unknown_patient_is_404() {
        let app = test_app();
        let resp = app
            .json("PUT", "/api/pacientes/42", json!({"nome_completo": "Ninguém"}))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Paciente não encontrado");
    }

    #[tokio::test]
    async fn patient_csv_export_and_import() {
        let app = test_app();
        app.create_patient("Maria Souza", "123").await;

        let resp = app.get("/api/pacientes/export").await;
        let json = body_json(resp).await;
        assert!(json["data"].as_str().unwrap().starts_with("Nome Completo,CPF,Data Nascimento"));
        assert!(json["filename"].as_str().unwrap().starts_with("pacientes_"));

        let resp = app
            .json(
                "POST",
                "/api/pacientes/import",
                json!({"csv_content": "Nome Completo,CPF,Data Nascimento\nMaria Souza,123,\nJoão,456,1970-01-01\n"}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["imported"], 1);
        assert_eq!(json["duplicated"], 1);
        assert_eq!(json["errors"], json!([]));

        let resp = app.json("POST", "/api/pacientes/import", json!({})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // -- Medications --------------------------------------------------------

    #[tokio::test]
    async fn seed_only_into_empty_catalogue() {
        let app = test_app();
        let resp = app.json("POST", "/api/medicamentos/seed", json!({})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await["message"],
            "15 medicamentos de teste adicionados com sucesso"
        );
        assert_eq!(body_json(app.get("/api/medicamentos").await).await["total"], 15);

        let resp = app.json("POST", "/api/medicamentos/seed", json!({})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn medication_requires_generic_name() {
        let app = test_app();
        let resp = app
            .json("POST", "/api/medicamentos", json!({"concentracao": "10 mg"}))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Denominação genérica é obrigatória");
    }

    // -- Prescriptions ------------------------------------------------------

    #[tokio::test]
    async fn stored_prescription_renders_pdf() {
        let app = test_app();
        let patient = app.create_patient("Maria Souza", "123").await;
        let med = app.create_medication("Sertralina").await;

        let resp = app
            .json(
                "POST",
                "/api/receitas",
                json!({
                    "paciente_id": patient,
                    "data_inicial": "2024-01-15",
                    "num_receitas": 3,
                    "observacoes": "Retornar em 90 dias",
                    "medicamentos": [{"medicamento_id": med, "posologia": "1 comprimido ao dia"}]
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        let id = json["data"]["id"].as_i64().unwrap();
        assert_eq!(json["data"]["paciente"]["nome_completo"], "Maria Souza");
        assert_eq!(json["data"]["medicamentos"][0]["medicamento"]["denominacao_generica"], "Sertralina");

        let list = body_json(app.get("/api/receitas").await).await;
        assert_eq!(list["total"], 1);

        let resp = app.get(&format!("/api/receitas/{id}/pdf")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.contains("receitas_Maria_Souza_20240115_3meses.pdf"));
        assert!(body_bytes(resp).await.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn missing_prescription_pdf_is_404() {
        let app = test_app();
        let resp = app.get("/api/receitas/77/pdf").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Receita não encontrada");
    }

    #[tokio::test]
    async fn generate_renders_without_storing() {
        let app = test_app();
        let patient = app.create_patient("João Silva", "").await;
        let med = app.create_medication("Omeprazol").await;

        let resp = app
            .json(
                "POST",
                "/api/receitas/generate",
                json!({
                    "paciente_id": patient,
                    "data_inicial": "2024-03-01",
                    "medicamentos": [{"medicamento_id": med}]
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.contains("receita_Jo%C3%A3o_Silva_20240301.pdf"));
        assert!(body_bytes(resp).await.starts_with(b"%PDF"));

        assert_eq!(body_json(app.get("/api/receitas").await).await["total"], 0);
    }

    #[tokio::test]
    async fn generate_with_unknown_medication_is_404() {
        let app = test_app();
        let patient = app.create_patient("Maria", "1").await;
        let resp = app
            .json(
                "POST",
                "/api/receitas/generate",
                json!({
                    "paciente_id": patient,
                    "data_inicial": "2024-03-01",
                    "medicamentos": [{"medicamento_id": 99}]
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Medicamento ID 99 não encontrado");
    }

    #[tokio::test]
    async fn patient_with_prescriptions_cannot_be_deleted() {
        let app = test_app();
        let patient = app.create_patient("Maria", "1").await;
        let med = app.create_medication("Dipirona").await;
        let resp = app
            .json(
                "POST",
                "/api/receitas",
                json!({"paciente_id": patient, "data_inicial": "2024-03-01", "medicamentos": [{"medicamento_id": med}]}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .send(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/pacientes/{patient}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // -- Static files and shutdown -----------------------------------------

    #[tokio::test]
    async fn unknown_paths_fall_back_to_index() {
        let app = test_app();
        let resp = app.get("/pacientes/novo").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains("Receituário"));
    }

    #[tokio::test]
    async fn shutdown_notifies_server() {
        let app = test_app();
        let resp = app.json("POST", "/api/shutdown", json!({})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        tokio::time::timeout(std::time::Duration::from_secs(1), app.ctx.shutdown.notified())
            .await
            .expect("shutdown permit stored");
    }
}
