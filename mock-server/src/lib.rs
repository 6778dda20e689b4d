use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Endpoints that exist in a fresh server, each backed by its own swarm.
pub const SEEDED_ENDPOINTS: [i64; 2] = [1, 2];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceControl {
    pub id: i64,
    pub resource_id: String,
    pub administrators_only: bool,
    pub public: bool,
    pub teams: Vec<i64>,
    pub users: Vec<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Stack {
    pub id: i64,
    pub name: String,
    #[serde(rename = "Type")]
    pub stack_type: i64,
    pub endpoint_id: i64,
    pub swarm_id: String,
    pub env: Vec<EnvVar>,
    pub resource_control: ResourceControl,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Swarm {
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct Token {
    pub jwt: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateStack {
    pub name: String,
    pub stack_file_content: String,
    #[serde(rename = "SwarmID")]
    pub swarm_id: String,
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateStack {
    pub stack_file_content: String,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub prune: bool,
    #[serde(default)]
    pub pull_image: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateResourceControl {
    pub administrators_only: bool,
    pub public: bool,
    pub teams: Vec<i64>,
    pub users: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackFilters {
    swarm_id: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    filters: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateQuery {
    endpoint_id: Option<i64>,
    method: Option<String>,
    #[serde(rename = "type")]
    stack_type: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateQuery {
    endpoint_id: Option<i64>,
}

/// Everything the service knows, plus what each stack was last deployed with.
#[derive(Debug, Default)]
pub struct Store {
    pub tokens: HashSet<String>,
    pub swarms: HashMap<i64, String>,
    pub teams: Vec<Team>,
    pub stacks: Vec<Stack>,
    pub stack_files: HashMap<i64, String>,
    pub last_update: HashMap<i64, (bool, bool)>,
    next_stack_id: i64,
    next_resource_control_id: i64,
}

impl Store {
    fn seeded() -> Self {
        Self {
            swarms: SEEDED_ENDPOINTS
                .iter()
                .map(|id| (*id, Uuid::new_v4().simple().to_string()))
                .collect(),
            teams: vec![
                Team { id: 1, name: "developers".to_string() },
                Team { id: 2, name: "operators".to_string() },
            ],
            next_stack_id: 1,
            // Offset so resource control ids never coincide with stack ids.
            next_resource_control_id: 100,
            ..Self::default()
        }
    }

    fn resource_control_mut(&mut self, id: i64) -> Option<&mut ResourceControl> {
        self.stacks
            .iter_mut()
            .map(|stack| &mut stack.resource_control)
            .find(|rc| rc.id == id)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// JSON failure body in the `{message, details}` shape the service uses.
pub struct Failure {
    status: StatusCode,
    message: &'static str,
    details: String,
}

impl Failure {
    fn new(status: StatusCode, message: &'static str, details: impl Into<String>) -> Self {
        Self {
            status,
            message,
            details: details.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message, "details": self.details });
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with_store(seeded_store())
}

/// Router over a caller-held store, so tests can inspect state afterwards.
pub fn app_with_store(db: Db) -> Router {
    let protected = Router::new()
        .route("/endpoints/{id}/docker/swarm", get(get_swarm))
        .route("/teams", get(list_teams))
        .route("/stacks", get(list_stacks).post(create_stack))
        .route("/stacks/{id}", put(update_stack))
        .route("/resource_controls/{id}", put(update_resource_control))
        .route_layer(middleware::from_fn_with_state(db.clone(), require_token));

    let api = Router::new().route("/auth", post(authenticate)).merge(protected);

    Router::new().nest("/api", api).with_state(db)
}

pub fn seeded_store() -> Db {
    Arc::new(RwLock::new(Store::seeded()))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_token(State(db): State<Db>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);
    let known = match token {
        Some(token) => db.read().await.tokens.contains(&token),
        None => false,
    };
    if !known {
        return Failure::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "A valid authorisation token is missing",
        )
        .into_response();
    }
    next.run(request).await
}

async fn authenticate(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<Json<Token>, Failure> {
    if input.username != ADMIN_USERNAME || input.password != ADMIN_PASSWORD {
        return Err(Failure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid credentials",
            "Unauthorized",
        ));
    }
    let jwt = Uuid::new_v4().to_string();
    db.write().await.tokens.insert(jwt.clone());
    info!(username = %input.username, "issued token");
    Ok(Json(Token { jwt }))
}

async fn get_swarm(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Swarm>, Failure> {
    let store = db.read().await;
    store
        .swarms
        .get(&id)
        .map(|swarm_id| Json(Swarm { id: swarm_id.clone() }))
        .ok_or_else(|| {
            Failure::new(
                StatusCode::NOT_FOUND,
                "Unable to find an endpoint with the specified identifier inside the database",
                format!("endpoint {id} not found"),
            )
        })
}

async fn list_teams(State(db): State<Db>) -> Json<Vec<Team>> {
    Json(db.read().await.teams.clone())
}

async fn list_stacks(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Stack>>, Failure> {
    let filters = match query.filters {
        Some(raw) => serde_json::from_str::<StackFilters>(&raw).map_err(|e| {
            Failure::new(StatusCode::BAD_REQUEST, "Invalid query parameter: filters", e.to_string())
        })?,
        None => StackFilters { swarm_id: None },
    };
    let store = db.read().await;
    let stacks = store
        .stacks
        .iter()
        .filter(|stack| match &filters.swarm_id {
            Some(swarm_id) => &stack.swarm_id == swarm_id,
            None => true,
        })
        .cloned()
        .collect();
    Ok(Json(stacks))
}

async fn create_stack(
    State(db): State<Db>,
    Query(query): Query<CreateQuery>,
    Json(input): Json<CreateStack>,
) -> Result<Json<Stack>, Failure> {
    let endpoint_id = query.endpoint_id.ok_or_else(|| {
        Failure::new(StatusCode::BAD_REQUEST, "Invalid query parameter: endpointId", "missing")
    })?;
    if query.method.as_deref() != Some("string") {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "Invalid query parameter: method",
            "only string deployments are supported",
        ));
    }
    if query.stack_type != Some(1) {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "Invalid query parameter: type",
            "only swarm stacks are supported",
        ));
    }

    let mut store = db.write().await;
    if store.swarms.get(&endpoint_id) != Some(&input.swarm_id) {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "Invalid request payload",
            format!("swarm {} does not belong to endpoint {endpoint_id}", input.swarm_id),
        ));
    }
    if store.stacks.iter().any(|stack| stack.name == input.name) {
        return Err(Failure::new(
            StatusCode::CONFLICT,
            "A stack with this name already exists",
            format!("stack {} already exists", input.name),
        ));
    }

    let id = store.next_stack_id;
    store.next_stack_id += 1;
    let rc_id = store.next_resource_control_id;
    store.next_resource_control_id += 1;

    let stack = Stack {
        id,
        name: input.name.clone(),
        stack_type: 1,
        endpoint_id,
        swarm_id: input.swarm_id,
        env: input.env,
        resource_control: ResourceControl {
            id: rc_id,
            resource_id: format!("{endpoint_id}_{}", input.name),
            administrators_only: true,
            public: false,
            teams: Vec::new(),
            users: Vec::new(),
        },
    };
    store.stack_files.insert(id, input.stack_file_content);
    store.stacks.push(stack.clone());
    info!(id, name = %stack.name, "created stack");
    Ok(Json(stack))
}

async fn update_stack(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Query(query): Query<UpdateQuery>,
    Json(input): Json<UpdateStack>,
) -> Result<Json<Stack>, Failure> {
    let endpoint_id = query.endpoint_id.ok_or_else(|| {
        Failure::new(StatusCode::BAD_REQUEST, "Invalid query parameter: endpointId", "missing")
    })?;
    let mut store = db.write().await;
    let stack = store
        .stacks
        .iter_mut()
        .find(|stack| stack.id == id && stack.endpoint_id == endpoint_id)
        .ok_or_else(|| {
            Failure::new(
                StatusCode::NOT_FOUND,
                "Unable to find a stack with the specified identifier inside the database",
                format!("stack {id} not found on endpoint {endpoint_id}"),
            )
        })?;
    stack.env = input.env;
    let updated = stack.clone();
    store.stack_files.insert(id, input.stack_file_content);
    store.last_update.insert(id, (input.prune, input.pull_image));
    debug!(id, prune = input.prune, "updated stack");
    Ok(Json(updated))
}

async fn update_resource_control(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateResourceControl>,
) -> Result<Json<ResourceControl>, Failure> {
    let mut store = db.write().await;
    let rc = store.resource_control_mut(id).ok_or_else(|| {
        Failure::new(
            StatusCode::NOT_FOUND,
            "Unable to find a resource control with the specified identifier inside the database",
            format!("resource control {id} not found"),
        )
    })?;
    rc.administrators_only = input.administrators_only;
    rc.public = input.public;
    rc.teams = input.teams;
    rc.users = input.users;
    Ok(Json(rc.clone()))
}
