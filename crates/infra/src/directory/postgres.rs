//! Postgres-backed directory.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |----------------------|------------|----------|
//! | `23505` | `Conflict` | Duplicate email, tenant code, or (user, tenant) pair |
//! | `23503` | `NotFound` | Role or assignment referencing a missing user/tenant |
//! | Any other | `Backend` | Connection failures, decode errors, etc. |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use tenantry_auth::Role;
use tenantry_core::{TenantId, UserId};

use super::{
    normalize_email, AssignmentOutcome, DirectoryStore, Membership, NewTenant, NewUser, StoreError,
    StoreResult, TenantMember, TenantRecord, TenantSummary, UserRecord,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id               TEXT PRIMARY KEY,
        email            TEXT NOT NULL,
        normalized_email TEXT NOT NULL UNIQUE,
        first_name       TEXT NOT NULL DEFAULT '',
        last_name        TEXT NOT NULL DEFAULT '',
        is_active        BOOLEAN NOT NULL DEFAULT TRUE,
        email_confirmed  BOOLEAN NOT NULL DEFAULT FALSE,
        password_hash    TEXT NULL,
        created_at       TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id TEXT NOT NULL REFERENCES users(id),
        role    TEXT NOT NULL,
        PRIMARY KEY (user_id, role)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tenants (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        code        TEXT NOT NULL UNIQUE,
        description TEXT NULL,
        is_active   BOOLEAN NOT NULL DEFAULT TRUE,
        created_at  TIMESTAMPTZ NOT NULL,
        modified_at TIMESTAMPTZ NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_tenants (
        user_id     TEXT NOT NULL REFERENCES users(id),
        tenant_id   UUID NOT NULL REFERENCES tenants(id),
        role        TEXT NOT NULL,
        is_active   BOOLEAN NOT NULL DEFAULT TRUE,
        assigned_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (user_id, tenant_id)
    )
    "#,
];

const USER_COLUMNS: &str =
    "u.id, u.email, u.first_name, u.last_name, u.is_active, u.email_confirmed, u.password_hash, u.created_at";
const TENANT_COLUMNS: &str = "t.id, t.name, t.code, t.description, t.is_active, t.created_at, t.modified_at";

#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create the directory tables if they are missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectory {
    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.normalized_email = $1");
        let row = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| user_from_row(&r)).transpose().map_err(|e| decode_error("find_user_by_email", e))
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.map(|r| user_from_row(&r)).transpose().map_err(|e| decode_error("find_user", e))
    }

    #[instrument(skip(self, new), fields(email = %new.email), err)]
    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
        let user = UserRecord {
            id: UserId::generate(),
            email: new.email.trim().to_string(),
            first_name: new.first_name,
            last_name: new.last_name,
            is_active: true,
            email_confirmed: new.email_confirmed,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, normalized_email, first_name, last_name, is_active, email_confirmed, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(normalize_email(&user.email))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.email_confirmed)
        .bind(user.password_hash.as_deref())
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        Ok(user)
    }

    async fn list_active_users(&self) -> StoreResult<Vec<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.is_active ORDER BY u.email");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_active_users", e))?;
        rows.iter()
            .map(user_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| decode_error("list_active_users", e))
    }

    async fn has_users(&self) -> StoreResult<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users) AS present")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("has_users", e))?;
        row.try_get("present").map_err(|e| decode_error("has_users", e))
    }

    async fn update_user_profile(&self, id: &UserId, first_name: &str, last_name: &str) -> StoreResult<UserRecord> {
        let sql = format!(
            "UPDATE users u SET first_name = $2, last_name = $3 WHERE u.id = $1 AND u.is_active RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(first_name)
            .bind(last_name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user_profile", e))?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row).map_err(|e| decode_error("update_user_profile", e))
    }

    async fn set_password_hash(&self, id: &UserId, hash: String) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password_hash", e))?;
        expect_one_row(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn deactivate_user(&self, id: &UserId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("deactivate_user", e))?;
        expect_one_row(result.rows_affected())
    }

    async fn global_roles(&self, id: &UserId) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
            .bind(id.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("global_roles", e))?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("role").map(Role::new))
            .collect::<Result<_, _>>()
            .map_err(|e| decode_error("global_roles", e))
    }

    #[instrument(skip(self), fields(role = %role), err)]
    async fn add_global_role(&self, id: &UserId, role: &Role) -> StoreResult<bool> {
        let result = sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(id.as_str())
            .bind(role.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_global_role", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, new), fields(code = %new.code), err)]
    async fn create_tenant(&self, new: NewTenant) -> StoreResult<TenantRecord> {
        let tenant = TenantRecord {
            id: TenantId::new(),
            name: new.name,
            code: new.code,
            description: new.description,
            is_active: true,
            created_at: Utc::now(),
            modified_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, code, description, is_active, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            "#,
        )
        .bind(*tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.code)
        .bind(tenant.description.as_deref())
        .bind(tenant.is_active)
        .bind(tenant.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_tenant", e))?;

        Ok(tenant)
    }

    async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<TenantRecord>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant", e))?;
        row.map(|r| tenant_from_row(&r)).transpose().map_err(|e| decode_error("find_tenant", e))
    }

    async fn find_tenant_by_code(&self, code: &str) -> StoreResult<Option<TenantRecord>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.code = $1");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant_by_code", e))?;
        row.map(|r| tenant_from_row(&r)).transpose().map_err(|e| decode_error("find_tenant_by_code", e))
    }

    async fn list_active_tenants(&self) -> StoreResult<Vec<TenantSummary>> {
        let sql = format!(
            r#"
            SELECT {TENANT_COLUMNS},
                (SELECT COUNT(*) FROM user_tenants ut WHERE ut.tenant_id = t.id AND ut.is_active) AS user_count
            FROM tenants t
            WHERE t.is_active
            ORDER BY t.name
            "#
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_active_tenants", e))?;

        rows.iter()
            .map(|r| {
                let count: i64 = r.try_get("user_count")?;
                Ok(TenantSummary {
                    tenant: tenant_from_row(r)?,
                    user_count: usize::try_from(count).unwrap_or_default(),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| decode_error("list_active_tenants", e))
    }

    #[instrument(skip(self, description), err)]
    async fn update_tenant(&self, id: TenantId, name: &str, description: Option<&str>) -> StoreResult<TenantRecord> {
        let sql = format!(
            r#"
            UPDATE tenants t SET name = $2, description = $3, modified_at = $4
            WHERE t.id = $1 AND t.is_active
            RETURNING {TENANT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .bind(name)
            .bind(description)
            .bind(Utc::now())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_tenant", e))?
            .ok_or(StoreError::NotFound)?;
        tenant_from_row(&row).map_err(|e| decode_error("update_tenant", e))
    }

    #[instrument(skip(self), err)]
    async fn deactivate_tenant(&self, id: TenantId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE tenants SET is_active = FALSE, modified_at = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(Utc::now())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("deactivate_tenant", e))?;
        expect_one_row(result.rows_affected())
    }

    /// Upsert inside a transaction; the existing row is locked so a
    /// concurrent assign of the same pair waits instead of racing.
    #[instrument(skip(self), fields(role = %role), err)]
    async fn assign_tenant_role(&self, user: &UserId, tenant: TenantId, role: &Role) -> StoreResult<AssignmentOutcome> {
        // Concurrent first assignments of one pair resolve on the conflict arm.
        let row = sqlx::query(
            r#"
            WITH prev AS (
                SELECT is_active FROM user_tenants WHERE user_id = $1 AND tenant_id = $2
            )
            INSERT INTO user_tenants (user_id, tenant_id, role, is_active, assigned_at)
            VALUES ($1, $2, $3, TRUE, $4)
            ON CONFLICT (user_id, tenant_id) DO UPDATE
                SET role = EXCLUDED.role,
                    is_active = TRUE,
                    assigned_at = CASE
                        WHEN user_tenants.is_active THEN user_tenants.assigned_at
                        ELSE EXCLUDED.assigned_at
                    END
            RETURNING (xmax = 0) AS inserted, (SELECT is_active FROM prev) AS was_active
            "#,
        )
        .bind(user.as_str())
        .bind(*tenant.as_uuid())
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_tenant_role", e))?;

        let inserted: bool = row
            .try_get("inserted")
            .map_err(|e| decode_error("assign_tenant_role", e))?;
        let was_active: Option<bool> = row
            .try_get("was_active")
            .map_err(|e| decode_error("assign_tenant_role", e))?;
        Ok(assignment_outcome(inserted, was_active))
    }

    #[instrument(skip(self), err)]
    async fn unassign_tenant_role(&self, user: &UserId, tenant: TenantId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE user_tenants SET is_active = FALSE WHERE user_id = $1 AND tenant_id = $2")
            .bind(user.as_str())
            .bind(*tenant.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("unassign_tenant_role", e))?;
        expect_one_row(result.rows_affected())
    }

    async fn active_memberships(&self, user: &UserId) -> StoreResult<Vec<Membership>> {
        let sql = format!(
            r#"
            SELECT {TENANT_COLUMNS}, ut.role, ut.assigned_at
            FROM user_tenants ut
            JOIN tenants t ON t.id = ut.tenant_id
            WHERE ut.user_id = $1 AND ut.is_active
            ORDER BY ut.assigned_at
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("active_memberships", e))?;

        rows.iter()
            .map(|r| {
                Ok(Membership {
                    tenant: tenant_from_row(r)?,
                    role: Role::new(r.try_get::<String, _>("role")?),
                    assigned_at: r.try_get("assigned_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| decode_error("active_memberships", e))
    }

    async fn tenant_members(&self, tenant: TenantId) -> StoreResult<Vec<TenantMember>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}, ut.role, ut.assigned_at
            FROM user_tenants ut
            JOIN users u ON u.id = ut.user_id
            WHERE ut.tenant_id = $1 AND ut.is_active
            ORDER BY u.email
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(*tenant.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("tenant_members", e))?;

        rows.iter()
            .map(|r| {
                Ok(TenantMember {
                    user: user_from_row(r)?,
                    role: Role::new(r.try_get::<String, _>("role")?),
                    assigned_at: r.try_get("assigned_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| decode_error("tenant_members", e))
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    let id: String = row.try_get("id")?;
    Ok(UserRecord {
        id: id.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_active: row.try_get("is_active")?,
        email_confirmed: row.try_get("email_confirmed")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn tenant_from_row(row: &PgRow) -> Result<TenantRecord, sqlx::Error> {
    let id: uuid::Uuid = row.try_get("id")?;
    Ok(TenantRecord {
        id: TenantId::from_uuid(id),
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn expect_one_row(affected: u64) -> StoreResult<()> {
    if affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

fn decode_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {operation}: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound,
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

/// Classify an upsert. A conflict with no visible previous row means a
/// concurrent writer created the assignment first.
fn assignment_outcome(inserted: bool, was_active: Option<bool>) -> AssignmentOutcome {
    match (inserted, was_active) {
        (true, _) => AssignmentOutcome::Created,
        (false, Some(false)) => AssignmentOutcome::Reactivated,
        (false, _) => AssignmentOutcome::Updated,
    }
}
