//! speedrun.com HTTP transport implementation

use crate::auth::{AuthSlot, AuthState};
use crate::codec::{self, QUERY_PARAM};
use crate::error::{SpeedrunError, UNKNOWN_ERROR};
use crate::session::{self, SessionSlot};
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, USER_AGENT,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use zeroize::{Zeroize, Zeroizing};

/// Base address of the v2 API
pub const DEFAULT_BASE_URL: &str = "https://www.speedrun.com/api/v2/";

/// Product part of the outbound `User-Agent` header
pub const PRODUCT_TAG: &str = "speedrun-api-rs";

/// Locale sent as `Accept-Language` on every call
pub const LANGUAGE: &str = "en";

/// Default per-call timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

static SHARED: OnceLock<SpeedrunClient> = OnceLock::new();

/// HTTP verb used to dispatch an endpoint call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verb {
    /// Parameters sent as a JSON body
    #[default]
    Post,
    /// Parameters sent as base64 JSON in the `_r` query parameter
    Get,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Post => f.pad("POST"),
            Verb::Get => f.pad("GET"),
        }
    }
}

/// Where the client runs, which decides who owns the session cookie
///
/// Browser HTTP stacks forbid setting `Cookie` and `User-Agent` by hand and
/// keep the session in their own cookie jar. In that context the client never
/// touches either header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Native process: the client owns the session cookie
    Native,
    /// Browser (wasm): the platform cookie jar owns the session
    Browser,
}

impl ExecutionContext {
    /// Context of the current compilation target
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            ExecutionContext::Browser
        } else {
            ExecutionContext::Native
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::current()
    }
}

/// Non-fatal misuse detected while building a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// A session was supplied but the browser cookie jar owns the session
    SessionIgnoredInBrowser,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SessionIgnoredInBrowser => f.write_str(
                "session credential ignored: cookies cannot be set manually in a browser context",
            ),
        }
    }
}

/// Error body returned by the API on rejected calls
#[derive(serde::Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

/// The speedrun.com API transport
///
/// Every call goes through [`SpeedrunClient::request`], which posts the
/// parameters as JSON or encodes them into the query string, stores any
/// rotated session cookie and normalizes failures into [`SpeedrunError`].
///
/// One instance represents one logical session. Clones share the session, so
/// a clone can be handed to another task of the same session. Calls that
/// rotate the session should be awaited one after another: two concurrent
/// calls on the same instance may race on the session cookie.
///
/// For anonymous calls, [`SpeedrunClient::shared`] returns a process-wide
/// instance. Never log a user in through it.
///
/// # Example
///
/// ```no_run
/// use speedrun_http_client::{AuthState, SpeedrunClient};
///
/// # async fn run() -> Result<(), speedrun_http_client::SpeedrunError> {
/// let client = SpeedrunClient::builder()
///     .user_agent_suffix("my-bot")
///     .build()?;
///
/// if client.login("alice", "secret1").await? == AuthState::AwaitingSecondFactor {
///     client.set_token("12345").await?;
/// }
///
/// let session = client.get_session(&Default::default()).await?;
/// println!("signed in: {}", session.session.signed_in);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SpeedrunClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
    timeout: Duration,
    pub(crate) context: ExecutionContext,
    pub(crate) session: SessionSlot,
    pub(crate) auth: AuthSlot,
    diagnostics: Arc<[Diagnostic]>,
}

impl SpeedrunClient {
    /// Create a client with default settings and no session
    ///
    /// # Errors
    ///
    /// Returns `SpeedrunError::ClientInit` if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, SpeedrunError> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use speedrun_http_client::SpeedrunClient;
    /// use std::time::Duration;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = SpeedrunClient::builder()
    ///     .base_url("http://localhost:1234")?
    ///     .session("r2t5uvjq435r4q7ib3vtdjq120")
    ///     .timeout(Duration::from_secs(10))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> SpeedrunClientBuilder {
        SpeedrunClientBuilder::new()
    }

    /// The process-wide anonymous transport
    ///
    /// Built on first use with default settings unless one was installed with
    /// [`SpeedrunClient::install_shared`]. It never starts with a session, but
    /// it still stores rotated session cookies like any other instance, so
    /// every caller sees the cookie of whoever called last. Use a dedicated
    /// instance per authenticated user.
    pub fn shared() -> Result<&'static SpeedrunClient, SpeedrunError> {
        if let Some(client) = SHARED.get() {
            return Ok(client);
        }
        let client = Self::builder().build()?;
        Ok(SHARED.get_or_init(|| client))
    }

    /// Install a custom process-wide transport before first use
    ///
    /// Any session the client carries is dropped. Returns the client back if a
    /// shared transport already exists.
    pub fn install_shared(client: SpeedrunClient) -> Result<(), SpeedrunClient> {
        client.session.clear();
        client.auth.reset();
        SHARED.set(client)
    }

    /// Context this client was built for
    pub fn execution_context(&self) -> ExecutionContext {
        self.context
    }

    /// Misuse diagnostics collected at construction
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether an outbound session cookie is currently attached to calls
    pub fn has_session(&self) -> bool {
        self.session.is_set()
    }

    /// Current session identifier, e.g. to resume the session later
    ///
    /// Always `None` in a browser context.
    pub fn session_id(&self) -> Option<Zeroizing<String>> {
        self.session.id()
    }

    /// Call an endpoint and decode its JSON response
    ///
    /// `endpoint` is appended to the base address. With [`Verb::Post`] the
    /// parameters are the JSON request body; with [`Verb::Get`] they are
    /// serialized, base64-encoded and passed as the `_r` query parameter.
    ///
    /// After a successful call, a `PHPSESSID` cookie in the response replaces
    /// the stored session. Without one, the stored session is kept. An empty
    /// response body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// * `SpeedrunError::Rejected` - Non-success status, message from the payload's `error` field
    /// * `SpeedrunError::Transport` - No response received (network failure or timeout)
    /// * `SpeedrunError::Encode` - Parameters could not be serialized
    /// * `SpeedrunError::Decode` - Response did not match `R`
    #[instrument(skip(self, params, verb), fields(verb = %verb))]
    pub async fn request<P, R>(
        &self,
        endpoint: &str,
        params: &P,
        verb: Verb,
    ) -> Result<R, SpeedrunError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        let encode_error = |source| SpeedrunError::Encode {
            endpoint: endpoint.to_string(),
            source,
        };

        let mut request = match verb {
            Verb::Post => {
                let body = serde_json::to_vec(params).map_err(encode_error)?;
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body)
            }
            Verb::Get => {
                let payload = codec::encode_get_payload(params).map_err(encode_error)?;
                self.client.get(url).query(&[(QUERY_PARAM, payload)])
            }
        };

        if self.context == ExecutionContext::Native
            && let Some(cookie) = self.session.header()
        {
            request = request.header(COOKIE, cookie);
        }

        debug!("Sending request");
        let response = request.timeout(self.timeout).send().await?;
        let status = response.status();
        debug!(%status, "Response received");

        if !status.is_success() {
            return Err(Self::rejection(status, response).await);
        }

        self.rotate_session(response.headers())?;

        let body = response.bytes().await?;
        decode_body(endpoint, &body)
    }

    /// Build `{base}/{endpoint}` keeping the base path prefix
    fn endpoint_url(&self, endpoint: &str) -> Result<reqwest::Url, SpeedrunError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SpeedrunError::ClientInit("Cannot modify base URL path".to_string()))?
            .pop_if_empty()
            .push(endpoint);
        Ok(url)
    }

    /// Store a rotated session from response headers (native context only)
    fn rotate_session(&self, headers: &HeaderMap) -> Result<(), SpeedrunError> {
        if self.context != ExecutionContext::Native {
            return Ok(());
        }
        if let Some(mut id) = session::extract_session_id(headers) {
            debug!("Session rotated");
            let stored = self.session.set(&id);
            id.zeroize();
            stored?;
        }
        Ok(())
    }

    /// Normalize a non-success response
    async fn rejection(status: StatusCode, response: reqwest::Response) -> SpeedrunError {
        let message = response
            .json::<ErrorPayload>()
            .await
            .ok()
            .and_then(|payload| payload.error)
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        debug!(%status, %message, "Request rejected");
        SpeedrunError::Rejected { status, message }
    }
}

/// Decode a response body, treating an empty body as `null`
fn decode_body<R: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<R, SpeedrunError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|source| SpeedrunError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Compose the `User-Agent` value from the product tag and an optional suffix
fn user_agent(suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{}/{}", PRODUCT_TAG, suffix),
        _ => PRODUCT_TAG.to_string(),
    }
}

/// Builder for configuring a speedrun.com client
///
/// # Example
///
/// ```no_run
/// use speedrun_http_client::{ExecutionContext, SpeedrunClient};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Anonymous client
/// let client = SpeedrunClient::builder().build()?;
///
/// // Resume a session, identify the caller
/// let client = SpeedrunClient::builder()
///     .session("r2t5uvjq435r4q7ib3vtdjq120")
///     .user_agent_suffix("leaderboard-bot")
///     .build()?;
///
/// // Custom HTTP configuration
/// let client = SpeedrunClient::builder()
///     .client_builder(
///         speedrun_http_client::reqwest::Client::builder().pool_max_idle_per_host(2),
///     )
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SpeedrunClientBuilder {
    base_url: Option<reqwest::Url>,
    client_builder: Option<reqwest::ClientBuilder>,
    session: Option<Zeroizing<String>>,
    user_agent_suffix: Option<String>,
    context: Option<ExecutionContext>,
    timeout: Duration,
}

impl SpeedrunClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_builder: None,
            session: None,
            user_agent_suffix: None,
            context: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set a custom base URL, e.g. a mock server
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, SpeedrunError> {
        self.base_url = Some(
            url.into_url()
                .map_err(|e| SpeedrunError::ClientInit(e.to_string()))?,
        );
        Ok(self)
    }

    /// Resume an existing session
    ///
    /// Ignored with a [`Diagnostic`] in a browser context.
    pub fn session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(Zeroizing::new(session.into()));
        self
    }

    /// Identify the caller: the `User-Agent` becomes `speedrun-api-rs/<suffix>`
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.user_agent_suffix = Some(suffix.into());
        self
    }

    /// Override the detected execution context
    pub fn execution_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the per-call timeout (default 30 seconds)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom HTTP client builder
    ///
    /// The fixed `Accept`, `Accept-Language` and (native only) `User-Agent`
    /// headers always replace the builder's default headers.
    pub fn client_builder(mut self, builder: reqwest::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Build the client with the configured settings
    ///
    /// # Errors
    ///
    /// Returns `SpeedrunError::ClientInit` if the HTTP client cannot be
    /// initialized or a header value is invalid.
    pub fn build(self) -> Result<SpeedrunClient, SpeedrunError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => reqwest::Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| SpeedrunError::ClientInit(e.to_string()))?,
        };
        let context = self.context.unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGE));
        if context == ExecutionContext::Native {
            let agent = user_agent(self.user_agent_suffix.as_deref());
            let agent = HeaderValue::from_str(&agent)
                .map_err(|_| SpeedrunError::ClientInit("Invalid user agent suffix".to_string()))?;
            headers.insert(USER_AGENT, agent);
        }

        let client = self
            .client_builder
            .unwrap_or_else(reqwest::Client::builder)
            .default_headers(headers)
            .build()
            .map_err(|e| SpeedrunError::ClientInit(e.to_string()))?;

        let session = SessionSlot::default();
        let mut diagnostics = Vec::new();
        if let Some(initial) = self.session {
            match context {
                ExecutionContext::Native => session.set(&initial)?,
                ExecutionContext::Browser => {
                    let diagnostic = Diagnostic::SessionIgnoredInBrowser;
                    warn!("{}", diagnostic);
                    diagnostics.push(diagnostic);
                }
            }
        }

        let state = if session.is_set() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };

        Ok(SpeedrunClient {
            client,
            base_url,
            timeout: self.timeout,
            context,
            session,
            auth: AuthSlot::new(state),
            diagnostics: diagnostics.into(),
        })
    }
}

impl Default for SpeedrunClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpeedrunClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeedrunClientBuilder")
            .field("base_url", &self.base_url)
            .field("client_builder", &self.client_builder)
            .field("session", &self.session.as_ref().map(|_| "<redacted>"))
            .field("user_agent_suffix", &self.user_agent_suffix)
            .field("context", &self.context)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use mockito::Matcher;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn client_for(server: &mockito::ServerGuard) -> SpeedrunClient {
        SpeedrunClient::builder()
            .base_url(server.url())
            .unwrap()
            .execution_context(ExecutionContext::Native)
            .build()
            .unwrap()
    }

    // Base URL configuration
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_base_url_configuration(
            scheme in prop::sample::select(vec!["http", "https"]),
            host in "[a-z]{3,10}",
            port in 1000u16..10000u16,
        ) {
            let base_url = format!("{}://{}:{}/api/v2", scheme, host, port);

            let client = SpeedrunClient::builder()
                .base_url(&base_url)
                .unwrap()
                .build()
                .unwrap();

            prop_assert_eq!(client.base_url.scheme(), scheme);
            prop_assert_eq!(client.base_url.host_str(), Some(host.as_str()));
            prop_assert_eq!(client.base_url.port(), Some(port));

            let url = client.endpoint_url("GetSession").unwrap();
            prop_assert_eq!(url.path(), "/api/v2/GetSession");
        }
    }

    // User agent is the product tag, optionally suffixed with `/<suffix>`
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_user_agent_composition(suffix in "[a-zA-Z0-9._-]{1,20}") {
            prop_assert_eq!(user_agent(Some(&suffix)), format!("speedrun-api-rs/{}", suffix));
        }
    }

    #[test]
    fn test_user_agent_without_suffix() {
        assert_eq!(user_agent(None), PRODUCT_TAG);
        assert_eq!(user_agent(Some("")), PRODUCT_TAG);
    }

    #[test]
    fn test_default_base_url() {
        let client = SpeedrunClient::builder().build().unwrap();
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(
            client.endpoint_url("GetStaticData").unwrap().as_str(),
            "https://www.speedrun.com/api/v2/GetStaticData"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SpeedrunClient::builder().base_url("not a valid url");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_user_agent_suffix() {
        let result = SpeedrunClient::builder()
            .execution_context(ExecutionContext::Native)
            .user_agent_suffix("bad\nsuffix")
            .build();
        assert!(matches!(result, Err(SpeedrunError::ClientInit(_))));
    }

    #[test]
    fn test_builder_debug_redacts_session() {
        let builder = SpeedrunClient::builder().session("topsecret");
        let debug = format!("{:?}", builder);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_decode_empty_body_as_null() {
        let value: Value = decode_body("PutAuthLogout", b"").unwrap();
        assert_eq!(value, Value::Null);
        decode_body::<()>("PutAuthLogout", b"  \n").unwrap();
    }

    #[tokio::test]
    async fn test_post_sends_json_body_with_fixed_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/GetRun")
            .match_header("accept", "application/json")
            .match_header("accept-language", "en")
            .match_header("content-type", "application/json")
            .match_header("user-agent", "speedrun-api-rs/test-suite")
            .match_header("cookie", Matcher::Missing)
            .match_body(Matcher::Json(json!({"runId": "y8dwozoj"})))
            .with_status(200)
            .with_body(r#"{"run":{"id":"y8dwozoj"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = SpeedrunClient::builder()
            .base_url(server.url())
            .unwrap()
            .execution_context(ExecutionContext::Native)
            .user_agent_suffix("test-suite")
            .build()
            .unwrap();

        let response: Value = client
            .request("GetRun", &json!({"runId": "y8dwozoj"}), Verb::Post)
            .await
            .unwrap();

        assert_eq!(response["run"]["id"], "y8dwozoj");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_encodes_params_in_query() {
        let mut server = mockito::Server::new_async().await;
        let params = json!({"gameUrl": "sm64"});
        let encoded = general_purpose::STANDARD.encode(r#"{"gameUrl":"sm64"}"#);

        let mock = server
            .mock("GET", "/GetGameSummary")
            .match_query(Matcher::UrlEncoded("_r".into(), encoded))
            .match_body(Matcher::Exact(String::new()))
            .with_status(200)
            .with_body(r#"{"game":{"id":"o1y9wo6q","name":"Super Mario 64","url":"sm64"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let response: Value = client
            .request("GetGameSummary", &params, Verb::Get)
            .await
            .unwrap();

        assert_eq!(response["game"]["url"], "sm64");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_and_post_target_same_path() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/GetStaticData")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/GetStaticData")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let params = codec::NoParams::default();
        let _: Value = client.request("GetStaticData", &params, Verb::Post).await.unwrap();
        let _: Value = client.request("GetStaticData", &params, Verb::Get).await.unwrap();

        post.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_rotated_session_is_sent_and_kept() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/GetSession")
            .match_header("cookie", Matcher::Missing)
            .with_status(200)
            .with_header("set-cookie", "PHPSESSID=rotated123; path=/; HttpOnly")
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let later = server
            .mock("POST", "/GetSession")
            .match_header("cookie", "PHPSESSID=rotated123")
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(!client.has_session());

        for _ in 0..3 {
            let _: Value = client
                .request("GetSession", &codec::NoParams::default(), Verb::Post)
                .await
                .unwrap();
        }

        assert_eq!(
            client.session_id().as_deref().map(String::as_str),
            Some("rotated123")
        );
        first.assert_async().await;
        later.assert_async().await;
    }

    #[tokio::test]
    async fn test_initial_session_attached_in_native_context() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/GetSession")
            .match_header("cookie", "PHPSESSID=resumed")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let client = SpeedrunClient::builder()
            .base_url(server.url())
            .unwrap()
            .execution_context(ExecutionContext::Native)
            .session("resumed")
            .build()
            .unwrap();

        assert!(client.diagnostics().is_empty());
        assert_eq!(client.auth_state(), AuthState::Authenticated);

        let _: Value = client
            .request("GetSession", &codec::NoParams::default(), Verb::Post)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_browser_context_never_sends_session_or_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/GetSession")
            .match_header("cookie", Matcher::Missing)
            .match_header("user-agent", Matcher::Missing)
            .with_status(200)
            .with_header("set-cookie", "PHPSESSID=fromserver; path=/")
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let client = SpeedrunClient::builder()
            .base_url(server.url())
            .unwrap()
            .execution_context(ExecutionContext::Browser)
            .session("ignored")
            .user_agent_suffix("ignored-too")
            .build()
            .unwrap();

        assert_eq!(client.diagnostics(), &[Diagnostic::SessionIgnoredInBrowser]);
        assert!(!client.has_session());

        for _ in 0..2 {
            let _: Value = client
                .request("GetSession", &codec::NoParams::default(), Verb::Post)
                .await
                .unwrap();
        }

        assert!(!client.has_session());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_uses_error_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/PutAuthLogin")
            .with_status(401)
            .with_body(r#"{"error":"Invalid password"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .request::<_, Value>("PutAuthLogin", &json!({"name": "alice"}), Verb::Post)
            .await
            .unwrap_err();

        match err {
            SpeedrunError::Rejected { status, ref message } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(message, "Invalid password");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_does_not_rotate_session() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/GetSession")
            .with_status(500)
            .with_header("set-cookie", "PHPSESSID=shouldnotstick")
            .create_async()
            .await;

        let client = client_for(&server);
        let result: Result<Value, _> = client
            .request("GetSession", &codec::NoParams::default(), Verb::Post)
            .await;

        assert_eq!(result.unwrap_err().status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_transport_failure_is_normalized() {
        let client = SpeedrunClient::builder()
            .base_url("http://127.0.0.1:1")
            .unwrap()
            .execution_context(ExecutionContext::Native)
            .build()
            .unwrap();

        let err = client
            .request::<_, Value>("GetSession", &codec::NoParams::default(), Verb::Post)
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection but never answer
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = SpeedrunClient::builder()
            .base_url(format!("http://{}", addr))
            .unwrap()
            .execution_context(ExecutionContext::Native)
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let err = client
            .request::<_, Value>("GetSession", &codec::NoParams::default(), Verb::Post)
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert!(err.is_timeout());
        server.abort();
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/GetRun")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .request::<_, Value>("GetRun", &json!({}), Verb::Post)
            .await
            .unwrap_err();

        assert!(matches!(err, SpeedrunError::Decode { ref endpoint, .. } if endpoint == "GetRun"));
    }

    // Non-success statuses are normalized with their code and the fallback message
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_rejection_without_error_field(
            status_code in prop::sample::select(vec![400u16, 401, 403, 404, 429, 500, 502, 503]),
            body in prop::sample::select(vec!["", "{}", r#"{"message":"nope"}"#, "<html></html>"]),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let err = runtime.block_on(async {
                let mut server = mockito::Server::new_async().await;
                let _mock = server
                    .mock("POST", "/GetSearch")
                    .with_status(status_code as usize)
                    .with_body(body)
                    .create_async()
                    .await;

                let client = client_for(&server);
                client
                    .request::<_, Value>("GetSearch", &json!({"query": "mario"}), Verb::Post)
                    .await
                    .unwrap_err()
            });

            match err {
                SpeedrunError::Rejected { status, message } => {
                    prop_assert_eq!(status.as_u16(), status_code);
                    prop_assert_eq!(message, UNKNOWN_ERROR);
                }
                other => prop_assert!(false, "Expected Rejected, got {:?}", other),
            }
        }
    }
}
