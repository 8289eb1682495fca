//! Application state shared across handlers

use governor::{Quota, RateLimiter};
use sqlx::PgPool;
use std::num::NonZeroU32;
use std::sync::Arc;

use weld_core::{MappingService, OrganizationId, SpaceService};
use weld_db::{PgGroupMappingRepository, PgSpaceRepository, PgUserRepository};
use weld_identity::{HttpIdentityDirectory, Provisioner, TokenVerifier};
use weld_openfga::FgaAuthorizationStore;

/// Keyed rate limiter for IP-based rate limiting
pub type IpRateLimiter = RateLimiter<
    String,
    governor::state::keyed::DefaultKeyedStateStore<String>,
    governor::clock::DefaultClock,
>;

pub type AppProvisioner = Provisioner<
    PgUserRepository,
    PgSpaceRepository,
    PgGroupMappingRepository,
    FgaAuthorizationStore,
>;

pub type AppSpaceService = SpaceService<PgSpaceRepository, FgaAuthorizationStore>;

pub type AppMappingService = MappingService<PgGroupMappingRepository, FgaAuthorizationStore>;

/// Requests per second allowed per client IP on rate-limited routes.
pub(crate) const RATE_LIMIT_PER_SECOND: u32 = 100;
/// Burst allowance on top of the steady rate.
pub(crate) const RATE_LIMIT_BURST: u32 = 200;

/// Shared application state
///
/// Cheap to clone: everything inside is behind an `Arc` or is itself a
/// pooled handle.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub users: Arc<PgUserRepository>,
    pub spaces: Arc<PgSpaceRepository>,
    pub authz: Arc<FgaAuthorizationStore>,
    pub provisioner: Arc<AppProvisioner>,
    pub space_service: Arc<AppSpaceService>,
    pub mapping_service: Arc<AppMappingService>,
    pub token_verifier: Arc<TokenVerifier>,
    pub directory: Arc<HttpIdentityDirectory>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        authz: Arc<FgaAuthorizationStore>,
        token_verifier: TokenVerifier,
        directory: HttpIdentityDirectory,
        organization_id: OrganizationId,
    ) -> Self {
        let users = Arc::new(PgUserRepository::new(db_pool.clone()));
        let spaces = Arc::new(PgSpaceRepository::new(db_pool.clone()));
        let mappings = Arc::new(PgGroupMappingRepository::new(db_pool.clone()));

        let provisioner = Arc::new(Provisioner::new(
            users.clone(),
            spaces.clone(),
            mappings.clone(),
            authz.clone(),
            organization_id,
        ));
        let space_service = Arc::new(SpaceService::new(
            spaces.clone(),
            authz.clone(),
            organization_id,
        ));
        let mapping_service = Arc::new(MappingService::new(
            mappings,
            authz.clone(),
            organization_id,
        ));

        let quota = Quota::per_second(NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap())
            .allow_burst(NonZeroU32::new(RATE_LIMIT_BURST).unwrap());
        let rate_limiter = Arc::new(RateLimiter::keyed(quota));

        Self {
            db_pool,
            users,
            spaces,
            authz,
            provisioner,
            space_service,
            mapping_service,
            token_verifier: Arc::new(token_verifier),
            directory: Arc::new(directory),
            rate_limiter,
        }
    }
}
