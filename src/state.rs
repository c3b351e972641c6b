use std::fmt;
use std::sync::Arc;

use slate_cache::RedisCache;
use slate_config::{
    CorsConfig, IpRateLimit, JwtConfig, RateLimitConfig, RetryConfig, TaskQueueConfig,
};
use slate_core::{AppError, RetryPolicy};
use slate_db::{AuditSink, PgPool, PgStore, SchoolStore};
use slate_tasks::{HandlerRegistry, TaskQueue, TaskSink, TaskWorker};
use tracing::info;

use crate::authz::{AuthorizationEngine, PermissionMatrix};
use crate::notifications::{self, LogNotifier};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SchoolStore>,
    pub audit: Arc<dyn AuditSink>,
    pub tasks: Arc<dyn TaskSink>,
    pub authz: Arc<AuthorizationEngine>,
    pub cache: Option<RedisCache>,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub enroll_retry: RetryPolicy,
    /// Shared by every router built from this state; `None` disables limiting.
    pub rate_limit: Option<Arc<IpRateLimit>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("authz", &self.authz)
            .field("cache_enabled", &self.cache.is_some())
            .field("enroll_retry", &self.enroll_retry)
            .field("rate_limited", &self.rate_limit.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State without a cache or rate limit, with default CORS and retry settings.
    pub fn new(
        store: Arc<dyn SchoolStore>,
        audit: Arc<dyn AuditSink>,
        tasks: Arc<dyn TaskSink>,
        matrix: PermissionMatrix,
        jwt_config: JwtConfig,
    ) -> Self {
        let authz = Arc::new(AuthorizationEngine::new(matrix, audit.clone()));
        Self {
            store,
            audit,
            tasks,
            authz,
            cache: None,
            jwt_config,
            cors_config: CorsConfig::parse(""),
            enroll_retry: RetryPolicy::default(),
            rate_limit: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<RedisCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cors(mut self, cors_config: CorsConfig) -> Self {
        self.cors_config = cors_config;
        self
    }

    pub fn with_enroll_retry(mut self, policy: RetryPolicy) -> Self {
        self.enroll_retry = policy;
        self
    }

    pub fn with_rate_limit(mut self, config: &RateLimitConfig) -> Result<Self, AppError> {
        self.rate_limit = if config.enabled {
            Some(Arc::new(config.governor_config()?))
        } else {
            None
        };
        Ok(self)
    }
}

/// Loads the permission matrix from the store. An empty rule table means the
/// school has not customised anything yet, so the defaults apply. A stored
/// table must still have a rule for every pair the defaults cover.
pub async fn load_permission_matrix(store: &dyn SchoolStore) -> Result<PermissionMatrix, AppError> {
    let rules = store.load_permission_rules().await?;
    if rules.is_empty() {
        info!("No permission rules stored, using school defaults");
        return Ok(PermissionMatrix::school_defaults());
    }

    let matrix = PermissionMatrix::from_rules(rules)?;
    matrix.ensure_covers(&PermissionMatrix::school_defaults())?;
    info!(rules = matrix.len(), "Loaded permission rules");
    Ok(matrix)
}

/// Builds the production state on top of PostgreSQL, plus the task worker
/// that must be spawned alongside the server.
pub async fn init_app_state(
    pool: PgPool,
    cache: Option<RedisCache>,
) -> Result<(AppState, TaskWorker), AppError> {
    let store = Arc::new(PgStore::new(pool));
    let matrix = load_permission_matrix(store.as_ref()).await?;

    let task_config = TaskQueueConfig::from_env();
    let (queue, receiver) = TaskQueue::new(task_config.capacity);
    let registry = HandlerRegistry::new().register(
        notifications::ENROLLMENT_NOTICE,
        Arc::new(notifications::EnrollmentNoticeHandler::new(Arc::new(
            LogNotifier,
        ))),
    );
    let worker = TaskWorker::new(receiver, registry, task_config.retry_policy());

    let state = AppState::new(
        store.clone(),
        store,
        Arc::new(queue),
        matrix,
        JwtConfig::from_env(),
    )
    .with_cache(cache)
    .with_cors(CorsConfig::from_env())
    .with_enroll_retry(RetryConfig::from_env().policy())
    .with_rate_limit(&RateLimitConfig::from_env())?;

    Ok((state, worker))
}
