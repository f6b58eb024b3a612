//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here; access control is delegated to SessionGuard.

use dotenv::dotenv;
use folio_admin::adapters::browser::BrowserLocation;
use folio_admin::adapters::mail::ResendMailer;
use folio_admin::adapters::memory::{InMemoryIdentity, InMemoryStorage, InMemoryStore};
use folio_admin::adapters::supabase::{
    SupabaseClient, SupabaseIdentity, SupabaseRepo, SupabaseStorage,
};
use folio_admin::adapters::ui::tui::{ConsoleServices, TuiInputPort};
use folio_admin::ports::{
    AuthorizationPort, ContactRepoPort, GalleryRepoPort, IdentityPort, InputPort, MailPort,
    NavigatorPort, ProfileRepoPort, ProjectRepoPort, StoragePort,
};
use folio_admin::shared::config::AppConfig;
use folio_admin::usecases::{
    ContactService, GalleryService, GuardSettings, LoginService, MediaUploader, ProfileService,
    ProjectService, PublicCatalog, SearchBus, SessionGuard, SessionRefresher,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_EMAIL: &str = "admin@localhost";
const DEMO_PASSWORD: &str = "admin";

/// Port set for one backend.
struct Backend {
    identity: Arc<dyn IdentityPort>,
    authorization: Arc<dyn AuthorizationPort>,
    projects: Arc<dyn ProjectRepoPort>,
    gallery: Arc<dyn GalleryRepoPort>,
    profiles: Arc<dyn ProfileRepoPort>,
    contact: Arc<dyn ContactRepoPort>,
    storage: Arc<dyn StoragePort>,
}

fn supabase_backend(url: &str, anon_key: &str) -> Backend {
    let client = Arc::new(SupabaseClient::new(url, anon_key));
    let repo = Arc::new(SupabaseRepo::new(Arc::clone(&client)));
    Backend {
        identity: Arc::new(SupabaseIdentity::new(Arc::clone(&client))),
        authorization: Arc::clone(&repo) as Arc<dyn AuthorizationPort>,
        projects: Arc::clone(&repo) as Arc<dyn ProjectRepoPort>,
        gallery: Arc::clone(&repo) as Arc<dyn GalleryRepoPort>,
        profiles: Arc::clone(&repo) as Arc<dyn ProfileRepoPort>,
        contact: repo as Arc<dyn ContactRepoPort>,
        storage: Arc::new(SupabaseStorage::new(client)),
    }
}

fn memory_backend() -> Backend {
    let identity = InMemoryIdentity::new().with_user(DEMO_EMAIL, DEMO_PASSWORD, "demo-admin");
    let store = Arc::new(InMemoryStore::new());
    store.set_admin("demo-admin", true);
    Backend {
        identity: Arc::new(identity),
        authorization: Arc::clone(&store) as Arc<dyn AuthorizationPort>,
        projects: Arc::clone(&store) as Arc<dyn ProjectRepoPort>,
        gallery: Arc::clone(&store) as Arc<dyn GalleryRepoPort>,
        profiles: Arc::clone(&store) as Arc<dyn ProfileRepoPort>,
        contact: store as Arc<dyn ContactRepoPort>,
        storage: Arc::new(InMemoryStorage::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    folio_admin::adapters::ui::init_ui();

    let cfg = AppConfig::load()?;

    // --- Backend: hosted project when configured, otherwise the in-memory demo ---
    let backend = match (cfg.supabase_url.as_deref(), cfg.supabase_anon_key.as_deref()) {
        (Some(url), Some(key)) if cfg.is_supabase_configured() => {
            info!(url, "using Supabase backend");
            supabase_backend(url, key)
        }
        _ => {
            warn!(
                email = DEMO_EMAIL,
                password = DEMO_PASSWORD,
                "SUPABASE_URL / SUPABASE_ANON_KEY not set, using in-memory demo backend"
            );
            memory_backend()
        }
    };

    let mailer: Option<Arc<dyn MailPort>> = match (cfg.resend_api_key.clone(), cfg.resend_from()) {
        (Some(key), Some(from)) if cfg.is_mail_configured() => {
            info!(from = %from, "owner notifications via Resend");
            Some(Arc::new(ResendMailer::new(key, from)))
        }
        _ => {
            info!("mail not configured, owner notifications disabled");
            None
        }
    };

    // --- Silent refresh before the access token expires ---
    let refresher =
        SessionRefresher::new(Arc::clone(&backend.identity), cfg.refresh_margin()).spawn();

    // --- Current tab: optional start route from argv, e.g. `/admin/projects?q=rust` ---
    let start = std::env::args().nth(1).unwrap_or_else(|| "/".to_string());
    let location = Arc::new(BrowserLocation::new(&start));
    let navigator = Arc::clone(&location) as Arc<dyn NavigatorPort>;

    // --- Services ---
    let uploader = Arc::new(MediaUploader::new(Arc::clone(&backend.storage)));
    let guard_settings = GuardSettings::from_config(&cfg);
    info!(
        login_path = %guard_settings.login_path,
        authz_retries = guard_settings.authz_retries,
        authz_timeout_ms = ?guard_settings.authz_timeout.map(|d| d.as_millis()),
        "session guard policy"
    );
    let guard = SessionGuard::new(
        Arc::clone(&backend.identity),
        Arc::clone(&backend.authorization),
        Arc::clone(&navigator),
        guard_settings,
    );

    let services = ConsoleServices {
        login: LoginService::new(
            Arc::clone(&backend.identity),
            Arc::clone(&backend.authorization),
            navigator,
            cfg.admin_home_or_default(),
        ),
        projects: ProjectService::new(
            Arc::clone(&backend.identity),
            Arc::clone(&backend.projects),
            Arc::clone(&uploader),
            cfg.project_buckets_or_default(),
        ),
        gallery: GalleryService::new(
            Arc::clone(&backend.gallery),
            Arc::clone(&uploader),
            cfg.media_bucket_or_default(),
            cfg.max_upload_bytes_or_default(),
        ),
        profile: ProfileService::new(
            Arc::clone(&backend.identity),
            Arc::clone(&backend.profiles),
            uploader,
            cfg.media_bucket_or_default(),
        ),
        catalog: PublicCatalog::new(
            Arc::clone(&backend.projects),
            Arc::clone(&backend.gallery),
            Arc::clone(&backend.profiles),
        ),
        contact: ContactService::new(backend.contact, backend.profiles, mailer),
    };

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        location,
        SearchBus::new(),
        guard,
        services,
    ));

    // --- Run (public pages -> login -> guarded admin area) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    refresher.abort();
    Ok(())
}
