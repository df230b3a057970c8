//! Test context for service-level integration tests.

use sqlx::{Connection, PgConnection, PgPool, query};

use crate::{
    database::Db,
    domain::{
        catalog::PgCatalogService,
        consent::PgConsentService,
        customers::PgCustomersService,
        quotes::PgQuotesService,
        receipts::PgReceiptsService,
        settings::{PgSettingsService, SettingsService},
        tenants::{
            PgTenantsService, TenantsService,
            data::NewTenant,
            records::TenantUuid,
        },
    },
};

use super::db::TestDb;

/// Name of the non-superuser app role used for RLS testing.
const APP_ROLE: &str = "quill_app_test";
const APP_ROLE_PASSWORD: &str = "quill_app_test_pass";

pub(crate) struct TestContext {
    pub(crate) db: TestDb,
    pub(crate) tenant_uuid: TenantUuid,
    pub(crate) settings: PgSettingsService,
    pub(crate) customers: PgCustomersService,
    pub(crate) catalog: PgCatalogService,
    pub(crate) quotes: PgQuotesService,
    pub(crate) consent: PgConsentService,
    pub(crate) receipts: PgReceiptsService,
}

impl TestContext {
    pub(crate) async fn new() -> Self {
        let test_db = TestDb::new().await;

        // Build a non-superuser app pool so RLS policies are enforced.
        // The superuser pool is only used for administrative setup and raw
        // assertions.
        let app_pool = Self::setup_app_pool(&test_db).await;
        let db = Db::new(app_pool);

        let tenant_uuid = TenantUuid::new();

        PgTenantsService::new(test_db.pool().clone())
            .create_tenant(NewTenant {
                uuid: tenant_uuid,
                name: "Test Tenant".to_string(),
            })
            .await
            .expect("Failed to create default test tenant");

        let settings = PgSettingsService::new(db.clone());

        // The default tenant is fully provisioned: settings row plus signing
        // secret version 1. Extra tenants from `create_tenant` start bare.
        settings
            .get_settings(tenant_uuid)
            .await
            .expect("Failed to provision default settings");

        settings
            .rotate_signing_secret(tenant_uuid)
            .await
            .expect("Failed to provision signing secret");

        Self {
            settings,
            customers: PgCustomersService::new(db.clone()),
            catalog: PgCatalogService::new(db.clone()),
            quotes: PgQuotesService::new(db.clone()),
            consent: PgConsentService::new(db.clone()),
            receipts: PgReceiptsService::new(db),
            tenant_uuid,
            db: test_db,
        }
    }

    /// Create an additional tenant for isolation tests.
    pub(crate) async fn create_tenant(&self, name: &str) -> TenantUuid {
        let uuid = TenantUuid::new();

        PgTenantsService::new(self.db.pool().clone())
            .create_tenant(NewTenant {
                uuid,
                name: name.to_string(),
            })
            .await
            .expect("Failed to create test tenant");

        uuid
    }

    /// Create a non-superuser role (once per server) and return a pool
    /// connected as it.
    ///
    /// PostgreSQL superusers bypass RLS even with `FORCE ROW LEVEL SECURITY`,
    /// so service tests that exercise isolation must connect via this
    /// restricted role.
    async fn setup_app_pool(test_db: &TestDb) -> PgPool {
        let su_url = &test_db.superuser_url;

        // Server-level DDL happens on the `postgres` maintenance database;
        // CREATE ROLE is server-scoped, not database-scoped.
        let postgres_url = su_url.rsplit_once('/').map(|x| x.0).unwrap_or(su_url);
        let postgres_url = format!("{postgres_url}/postgres");

        let mut server_conn = PgConnection::connect(&postgres_url)
            .await
            .expect("Failed to connect to postgres database for role setup");

        // Parallel tests may race on role creation; "role already exists"
        // (42710) or the underlying unique violation (23505) both mean the
        // role is present.
        let create_result = query(&format!(
            "CREATE ROLE {APP_ROLE} WITH LOGIN PASSWORD '{APP_ROLE_PASSWORD}' \
               NOSUPERUSER NOCREATEDB NOCREATEROLE"
        ))
        .execute(&mut server_conn)
        .await;

        if let Err(sqlx::Error::Database(ref e)) = create_result {
            if !matches!(e.code().as_deref(), Some("42710") | Some("23505")) {
                create_result.expect("Failed to create app role");
            }
        } else {
            create_result.expect("Failed to create app role");
        }

        query(&format!(
            "GRANT CONNECT ON DATABASE \"{}\" TO {APP_ROLE}",
            test_db.name
        ))
        .execute(&mut server_conn)
        .await
        .expect("Failed to grant CONNECT on test database");

        server_conn
            .close()
            .await
            .expect("Failed to close server connection");

        // Within the test database, grant schema and table privileges.
        let mut db_conn = PgConnection::connect(su_url)
            .await
            .expect("Failed to connect to test database for privilege setup");

        for stmt in [
            format!("GRANT USAGE ON SCHEMA public TO {APP_ROLE}"),
            format!(
                "GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA public TO {APP_ROLE}"
            ),
            format!("GRANT USAGE, SELECT ON ALL SEQUENCES IN SCHEMA public TO {APP_ROLE}"),
        ] {
            query(&stmt)
                .execute(&mut db_conn)
                .await
                .expect("Failed to grant table privileges to app role");
        }

        db_conn
            .close()
            .await
            .expect("Failed to close db connection");

        // Connect as the non-superuser role.
        let app_url = su_url.replacen(
            "quill_test:quill_test_password",
            &format!("{APP_ROLE}:{APP_ROLE_PASSWORD}"),
            1,
        );

        PgPool::connect(&app_url)
            .await
            .expect("Failed to create app pool")
    }
}
