use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use lmsctl::modules::course::model::Course;
use lmsctl::services::api::{cross_check, ApiClient, ApiError};

async fn list_courses() -> Json<Value> {
    Json(json!({
        "data": [
            { "id": "incoterms_2024", "title": "Introduction to Commercial Terms (Incoterms)", "published": true },
            { "id": "valves", "title": "Valves", "published": true }
        ]
    }))
}

async fn get_course(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        "incoterms_2024" => Ok(Json(json!({
            "id": "incoterms_2024",
            "title": "Introduction to Commercial Terms (Incoterms)",
            "modules": [{ "title": "Incoterms Presentation", "lessons": [] }]
        }))),
        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

/// Serves a fake LMS API on an ephemeral port and returns its base URL.
async fn setup_test_server() -> String {
    let app = Router::new()
        .route("/api/courses", get(list_courses))
        .route("/api/courses/{id}", get(get_course));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_list_courses_unwraps_data() {
    let base = setup_test_server().await;
    let client = ApiClient::new(&format!("{}/", base));

    let courses = assert_ok!(client.list_courses().await);
    assert_eq!(courses.len(), 2);
    assert_eq!(courses[1].title, "Valves");
}

#[tokio::test]
async fn test_get_course_found_and_missing() {
    let base = setup_test_server().await;
    let client = ApiClient::new(&base);

    let course = assert_ok!(client.get_course("incoterms_2024").await).unwrap();
    assert_eq!(course.modules.len(), 1);

    let missing = assert_ok!(client.get_course("nope").await);
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let base = setup_test_server().await;
    let client = ApiClient::new(&base);

    let err = assert_err!(client.get_course("broken").await);
    assert!(matches!(err, ApiError::Status(500, _)));
}

#[tokio::test]
async fn test_cross_check_against_served_list() {
    let base = setup_test_server().await;
    let served = ApiClient::new(&base).list_courses().await.unwrap();

    let db = vec![
        Course {
            id: Some("incoterms_2024".to_string()),
            title: "Introduction to Commercial Terms (Incoterms)".to_string(),
            is_published: Some(true),
            ..Course::default()
        },
        Course {
            id: Some("pumps".to_string()),
            title: "Pumps and Pump Spares".to_string(),
            published: Some(true),
            ..Course::default()
        },
    ];

    let check = cross_check(&db, &served);
    assert_eq!(check.matched, 1);
    assert_eq!(check.missing, vec!["Pumps and Pump Spares".to_string()]);
    assert_eq!(check.unexpected, vec!["Valves".to_string()]);
}
