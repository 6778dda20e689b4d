//! Session-aware client for the stack orchestration service.
//!
//! # Design
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes a successful
//! `HttpResponse`. Both are pure and public. The async operations join them
//! through `send`, the only place that touches the transport: it attaches the
//! session token on the way out and turns every failure into an `ApiError` on
//! the way back. No operation handles errors on its own.

use std::fmt;

use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

use crate::config::{normalize_base_url, ClientConfig};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::types::{InputResourceControl, InputStack, PatchStack, Stack, Swarm, Team};
use crate::wire::{
    env_list, AuthRequest, AuthResponse, ResourceControlUpdate, StackCreateBody, StackFilter,
    StackUpdateBody, WireStack, WireSwarm, WireTeam,
};

/// Deployment method sent with every stack creation.
const CREATE_METHOD: &str = "string";
/// Stack type sent with every stack creation (swarm stack).
const CREATE_TYPE: &str = "1";

/// The credential held by a client after a successful login.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }

    fn replace(&mut self, token: String) {
        self.token = Some(token);
    }
}

/// Client for one authenticated identity.
///
/// `login` needs `&mut self`; every other operation takes `&self`.
#[derive(Debug, Clone)]
pub struct StackClient<T = HttpTransport> {
    base_url: String,
    session: Session,
    transport: T,
}

impl StackClient<HttpTransport> {
    /// Client against `base_url` using the default transport settings.
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(&config.base_url, HttpTransport::new(config))
    }
}

impl<T> StackClient<T> {
    /// Client against `base_url` sending through `transport`.
    ///
    /// The address path is replaced with the API root. No network traffic.
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            session: Session::default(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_authorized(&self) -> bool {
        self.session.is_authorized()
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_login(&self, username: &str, password: &str) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Post,
            format!("{}/auth", self.base_url),
            &AuthRequest { username, password },
        )
    }

    pub fn build_get_swarm(&self, endpoint_id: i64) -> HttpRequest {
        self.bare_request(
            HttpMethod::Get,
            format!("{}/endpoints/{endpoint_id}/docker/swarm", self.base_url),
        )
    }

    pub fn build_get_teams(&self) -> HttpRequest {
        self.bare_request(HttpMethod::Get, format!("{}/teams", self.base_url))
    }

    pub fn build_get_stacks(&self, swarm_id: &str) -> Result<HttpRequest> {
        let filters = serde_json::to_string(&StackFilter { swarm_id }).map_err(ApiError::encode)?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("filters", &filters)
            .finish();
        Ok(self.bare_request(HttpMethod::Get, format!("{}/stacks?{query}", self.base_url)))
    }

    pub fn build_set_resource_control(&self, input: &InputResourceControl) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Put,
            format!("{}/resource_controls/{}", self.base_url, input.id),
            &ResourceControlUpdate::from(input),
        )
    }

    pub fn build_update_stack(&self, patch: &PatchStack) -> Result<HttpRequest> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("endpointId", &patch.endpoint_id.to_string())
            .finish();
        let body = StackUpdateBody {
            stack_file_content: &patch.stack,
            env: env_list(&patch.vars),
            prune: patch.prune,
            pull_image: true,
        };
        self.json_request(
            HttpMethod::Put,
            format!("{}/stacks/{}?{query}", self.base_url, patch.id),
            &body,
        )
    }

    /// Creation request for `input` on an already resolved `swarm`.
    pub fn build_create_stack(&self, input: &InputStack, swarm: &Swarm) -> Result<HttpRequest> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("endpointId", &input.endpoint_id.to_string())
            .append_pair("method", CREATE_METHOD)
            .append_pair("type", CREATE_TYPE)
            .finish();
        let body = StackCreateBody {
            name: &input.name,
            stack_file_content: &input.stack,
            swarm_id: &swarm.id,
            env: env_list(&input.vars),
        };
        self.json_request(HttpMethod::Post, format!("{}/stacks?{query}", self.base_url), &body)
    }

    fn bare_request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<B: serde::Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        body: &B,
    ) -> Result<HttpRequest> {
        let body = serde_json::to_string(body).map_err(ApiError::encode)?;
        Ok(HttpRequest {
            method,
            path,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    // -----------------------------------------------------------------------
    // Response parsers. Each expects a response that already passed `send`.
    // -----------------------------------------------------------------------

    /// Extract the session token from a login response.
    pub fn parse_login(&self, response: HttpResponse) -> Result<String> {
        decode::<AuthResponse>(&response).map(|auth| auth.jwt)
    }

    pub fn parse_get_swarm(&self, response: HttpResponse) -> Result<Swarm> {
        decode::<WireSwarm>(&response).map(Swarm::from)
    }

    pub fn parse_get_teams(&self, response: HttpResponse) -> Result<Vec<Team>> {
        let teams = decode::<Vec<WireTeam>>(&response)?;
        Ok(teams.into_iter().map(Team::from).collect())
    }

    pub fn parse_get_stacks(&self, response: HttpResponse) -> Result<Vec<Stack>> {
        let stacks = decode::<Vec<WireStack>>(&response)?;
        Ok(stacks.into_iter().map(Stack::from).collect())
    }

    /// The service's answer, unmapped. An empty body yields `Value::Null`.
    pub fn parse_set_resource_control(&self, response: HttpResponse) -> Result<serde_json::Value> {
        if response.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        decode(&response)
    }

    pub fn parse_create_stack(&self, response: HttpResponse) -> Result<Stack> {
        decode::<WireStack>(&response).map(Stack::from)
    }

    // -----------------------------------------------------------------------
    // Interceptors
    // -----------------------------------------------------------------------

    /// Request side: attach the bearer token when one is held.
    fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(token) = self.session.token() {
            request
                .headers
                .push(("authorization".to_string(), format!("Bearer {token}")));
        }
        request
    }
}

/// Response side: pass 2xx through, convert everything else.
fn normalize(outcome: std::result::Result<HttpResponse, TransportError>) -> Result<HttpResponse> {
    match outcome {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => {
            let err = ApiError::from_response(&response);
            warn!(status = %err.status, message = %err.message, "request rejected");
            Err(err)
        }
        Err(e) => {
            warn!(error = %e, "request failed without a response");
            Err(ApiError::placeholder())
        }
    }
}

fn decode<D: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<D> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::decode(response, e))
}

impl<T: Transport> StackClient<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = self.authorize(request);
        debug!(
            method = %request.method,
            url = %request.path,
            authenticated = request.header("authorization").is_some(),
            "sending request"
        );
        normalize(self.transport.execute(request).await)
    }

    /// Authenticate and store the returned token, replacing any previous one.
    ///
    /// On failure the current session is left untouched.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let request = self.build_login(username, password)?;
        let token = self.parse_login(self.send(request).await?)?;
        self.session.replace(token);
        info!("authenticated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_swarm(&self, endpoint_id: i64) -> Result<Swarm> {
        let response = self.send(self.build_get_swarm(endpoint_id)).await?;
        self.parse_get_swarm(response)
    }

    #[instrument(skip(self))]
    pub async fn get_teams(&self) -> Result<Vec<Team>> {
        let response = self.send(self.build_get_teams()).await?;
        self.parse_get_teams(response)
    }

    #[instrument(skip(self))]
    pub async fn get_stacks(&self, swarm_id: &str) -> Result<Vec<Stack>> {
        let response = self.send(self.build_get_stacks(swarm_id)?).await?;
        self.parse_get_stacks(response)
    }

    #[instrument(skip(self, input), fields(id = input.id))]
    pub async fn set_resource_control(&self, input: &InputResourceControl) -> Result<serde_json::Value> {
        let response = self.send(self.build_set_resource_control(input)?).await?;
        self.parse_set_resource_control(response)
    }

    /// Replace a stack's document and variables, always pulling images.
    #[instrument(skip(self, patch), fields(id = patch.id, endpoint_id = patch.endpoint_id))]
    pub async fn update_stack(&self, patch: &PatchStack) -> Result<()> {
        self.send(self.build_update_stack(patch)?).await?;
        Ok(())
    }

    /// Resolve the endpoint's swarm, then create the stack on it.
    ///
    /// A failed swarm lookup is returned as is and no create request is sent.
    #[instrument(skip(self, input), fields(name = %input.name, endpoint_id = input.endpoint_id))]
    pub async fn create_stack(&self, input: &InputStack) -> Result<Stack> {
        let swarm = self.get_swarm(input.endpoint_id).await?;
        let response = self.send(self.build_create_stack(input, &swarm)?).await?;
        let stack = self.parse_create_stack(response)?;
        info!(id = stack.id, swarm_id = %swarm.id, "stack created");
        Ok(stack)
    }
}
