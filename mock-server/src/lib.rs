//! A small in-memory API that answers in JSend.
//!
//! Serves a `things` collection under `/api` plus two routes that misbehave
//! on purpose: `/api/broken` answers with an `error` envelope and
//! `/api/plain` answers with a body that is not JSON at all.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thing {
    pub id: Uuid,
    pub name: String,
    pub done: bool,
}

#[derive(Deserialize)]
pub struct CreateThing {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Deserialize)]
pub struct UpdateThing {
    pub name: Option<String>,
    pub done: Option<bool>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Thing>>>;

type Reply = (StatusCode, Json<Value>);

fn success(status: StatusCode, data: Value) -> Reply {
    (status, Json(json!({"status": "success", "data": data})))
}

fn fail(status: StatusCode, data: Value) -> Reply {
    (status, Json(json!({"status": "fail", "data": data})))
}

fn error(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({"status": "error", "message": message})))
}

fn not_found() -> Reply {
    fail(StatusCode::NOT_FOUND, json!({"id": "thing not found"}))
}

fn name_required() -> Reply {
    fail(StatusCode::BAD_REQUEST, json!({"name": "name is required"}))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/api/things", get(list_things).post(create_thing))
        .route(
            "/api/things/{id}",
            get(get_thing).patch(update_thing).delete(delete_thing),
        )
        .route("/api/broken", get(broken))
        .route("/api/plain", get(plain))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_things(State(db): State<Db>) -> Reply {
    let things = db.read().await;
    let mut all: Vec<Thing> = things.values().cloned().collect();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    success(StatusCode::OK, json!({ "things": all }))
}

async fn create_thing(State(db): State<Db>, Json(input): Json<CreateThing>) -> Reply {
    if input.name.trim().is_empty() {
        return name_required();
    }
    let thing = Thing {
        id: Uuid::new_v4(),
        name: input.name,
        done: input.done,
    };
    db.write().await.insert(thing.id, thing.clone());
    info!(id = %thing.id, "created thing");
    success(StatusCode::CREATED, json!({ "thing": thing }))
}

async fn get_thing(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply {
    let things = db.read().await;
    match things.get(&id) {
        Some(thing) => success(StatusCode::OK, json!({ "thing": thing })),
        None => not_found(),
    }
}

async fn update_thing(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateThing>,
) -> Reply {
    let mut things = db.write().await;
    let Some(thing) = things.get_mut(&id) else {
        return not_found();
    };
    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return name_required();
        }
        thing.name = name;
    }
    if let Some(done) = input.done {
        thing.done = done;
    }
    debug!(%id, "updated thing");
    success(StatusCode::OK, json!({ "thing": thing }))
}

async fn delete_thing(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply {
    let mut things = db.write().await;
    match things.remove(&id) {
        Some(_) => {
            info!(%id, "deleted thing");
            success(StatusCode::OK, Value::Null)
        }
        None => not_found(),
    }
}

async fn broken() -> Reply {
    error(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn plain() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream went away")
}
