use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_PREFIX: &str = "api";
pub const API_VERSION: &str = "v1";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub profile: Value,
}

/// An uploaded part as seen by the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceivedFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
}

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

type Failure = (StatusCode, Json<Value>);

fn fail(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "message": message })))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    let api = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/avatar", axum::routing::post(upload_avatar))
        .route("/whoami", get(whoami))
        .route("/faults", get(fault_plain_text))
        .route("/faults/silent", get(fault_without_message))
        .with_state(db);
    Router::new().nest(&format!("/{API_PREFIX}/{API_VERSION}"), api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let users: Vec<User> = db.read().await.values().cloned().collect();
    Json(json!({ "query": query, "users": users }))
}

async fn create_user(State(db): State<Db>, Json(input): Json<Value>) -> Result<(StatusCode, Json<User>), Failure> {
    let name = input
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| fail(StatusCode::UNPROCESSABLE_ENTITY, "The name field is required."))?;
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        profile: input.get("profile").cloned().unwrap_or(Value::Null),
    };
    tracing::info!(id = %user.id, "user created");
    db.write().await.insert(user.id, user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<User>, Failure> {
    let users = db.read().await;
    users
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Value>, Failure> {
    let mut users = db.write().await;
    users
        .remove(&id)
        .map(|user| Json(json!({ "deleted": user.id })))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))
}

async fn upload_avatar(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Value>, Failure> {
    if !db.read().await.contains_key(&id) {
        return Err(fail(StatusCode::NOT_FOUND, "user not found"));
    }

    let mut fields = HashMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| fail(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| fail(StatusCode::BAD_REQUEST, &e.to_string()))?;
        match filename {
            Some(filename) => files.push(ReceivedFile {
                field: name,
                filename,
                content_type,
                size: data.len(),
            }),
            None => {
                fields.insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    if files.is_empty() {
        return Err(fail(StatusCode::UNPROCESSABLE_ENTITY, "The avatar field is required."));
    }
    Ok(Json(json!({ "user": id, "fields": fields, "files": files })))
}

fn header_value(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map_or(Value::Null, |v| Value::String(v.to_string()))
}

async fn whoami(headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "accept": header_value(&headers, "accept"),
        "server_protocol": header_value(&headers, "server_protocol"),
        "cookie": header_value(&headers, "cookie"),
        "request_id": header_value(&headers, "x-request-id"),
    }))
}

async fn fault_plain_text() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn fault_without_message() -> (StatusCode, Json<Value>) {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "maintenance" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: Uuid::nil(),
            name: "Ada".to_string(),
            profile: Value::Null,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Ada");
        assert!(json["profile"].is_null());
    }

    #[test]
    fn user_profile_defaults_to_null() {
        let user: User =
            serde_json::from_str(r#"{"id":"00000000-0000-0000-0000-000000000000","name":"Ada"}"#).unwrap();
        assert!(user.profile.is_null());
    }

    #[test]
    fn failures_carry_a_message_field() {
        let (status, Json(body)) = fail(StatusCode::NOT_FOUND, "user not found");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "user not found" }));
    }
}
