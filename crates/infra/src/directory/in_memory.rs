//! In-memory directory for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tenantry_auth::Role;
use tenantry_core::{TenantId, UserId};

use super::{
    normalize_email, AssignmentOutcome, DirectoryStore, Membership, NewTenant, NewUser, StoreError,
    StoreResult, TenantMember, TenantRecord, TenantSummary, UserRecord,
};

#[derive(Debug, Clone)]
struct Assignment {
    role: Role,
    is_active: bool,
    assigned_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, UserRecord>,
    emails: HashMap<String, UserId>,
    roles: HashMap<UserId, Vec<Role>>,
    tenants: HashMap<TenantId, TenantRecord>,
    codes: HashMap<String, TenantId>,
    assignments: HashMap<(UserId, TenantId), Assignment>,
}

/// Every uniqueness check happens under the write lock, so two concurrent
/// `create_user` calls for one email produce exactly one record.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("directory lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("directory lock poisoned".into()))
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let state = self.read()?;
        Ok(state
            .emails
            .get(&normalize_email(email))
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
        let key = normalize_email(&new.email);
        let mut state = self.write()?;
        if state.emails.contains_key(&key) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", new.email)));
        }

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
        state.emails.insert(key, user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn list_active_users(&self) -> StoreResult<Vec<UserRecord>> {
        let mut users: Vec<_> = self.read()?.users.values().filter(|u| u.is_active).cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn has_users(&self) -> StoreResult<bool> {
        Ok(!self.read()?.users.is_empty())
    }

    async fn update_user_profile(&self, id: &UserId, first_name: &str, last_name: &str) -> StoreResult<UserRecord> {
        let mut state = self.write()?;
        let user = state
            .users
            .get_mut(id)
            .filter(|u| u.is_active)
            .ok_or(StoreError::NotFound)?;
        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: &UserId, hash: String) -> StoreResult<()> {
        let mut state = self.write()?;
        let user = state.users.get_mut(id).ok_or(StoreError::NotFound)?;
        user.password_hash = Some(hash);
        Ok(())
    }

    async fn deactivate_user(&self, id: &UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        let user = state.users.get_mut(id).ok_or(StoreError::NotFound)?;
        user.is_active = false;
        Ok(())
    }

    async fn global_roles(&self, id: &UserId) -> StoreResult<Vec<Role>> {
        Ok(self.read()?.roles.get(id).cloned().unwrap_or_default())
    }

    async fn add_global_role(&self, id: &UserId, role: &Role) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.users.contains_key(id) {
            return Err(StoreError::NotFound);
        }
        let roles = state.roles.entry(id.clone()).or_default();
        if roles.contains(role) {
            return Ok(false);
        }
        roles.push(role.clone());
        Ok(true)
    }

    async fn create_tenant(&self, new: NewTenant) -> StoreResult<TenantRecord> {
        let mut state = self.write()?;
        if state.codes.contains_key(&new.code) {
            return Err(StoreError::Conflict(format!("tenant code '{}' already exists", new.code)));
        }

        let tenant = TenantRecord {
            id: TenantId::new(),
            name: new.name,
            code: new.code,
            description: new.description,
            is_active: true,
            created_at: Utc::now(),
            modified_at: None,
        };
        state.codes.insert(tenant.code.clone(), tenant.id);
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<TenantRecord>> {
        Ok(self.read()?.tenants.get(&id).cloned())
    }

    async fn find_tenant_by_code(&self, code: &str) -> StoreResult<Option<TenantRecord>> {
        let state = self.read()?;
        Ok(state.codes.get(code).and_then(|id| state.tenants.get(id)).cloned())
    }

    async fn list_active_tenants(&self) -> StoreResult<Vec<TenantSummary>> {
        let state = self.read()?;
        let mut tenants: Vec<_> = state
            .tenants
            .values()
            .filter(|t| t.is_active)
            .map(|t| TenantSummary {
                tenant: t.clone(),
                user_count: state
                    .assignments
                    .iter()
                    .filter(|((_, tid), a)| *tid == t.id && a.is_active)
                    .count(),
            })
            .collect();
        tenants.sort_by(|a, b| a.tenant.name.cmp(&b.tenant.name));
        Ok(tenants)
    }

    async fn update_tenant(&self, id: TenantId, name: &str, description: Option<&str>) -> StoreResult<TenantRecord> {
        let mut state = self.write()?;
        let tenant = state
            .tenants
            .get_mut(&id)
            .filter(|t| t.is_active)
            .ok_or(StoreError::NotFound)?;
        tenant.name = name.to_string();
        tenant.description = description.map(str::to_string);
        tenant.modified_at = Some(Utc::now());
        Ok(tenant.clone())
    }

    async fn deactivate_tenant(&self, id: TenantId) -> StoreResult<()> {
        let mut state = self.write()?;
        let tenant = state.tenants.get_mut(&id).ok_or(StoreError::NotFound)?;
        tenant.is_active = false;
        tenant.modified_at = Some(Utc::now());
        Ok(())
    }

    async fn assign_tenant_role(&self, user: &UserId, tenant: TenantId, role: &Role) -> StoreResult<AssignmentOutcome> {
        let mut state = self.write()?;
        if !state.users.contains_key(user) || !state.tenants.contains_key(&tenant) {
            return Err(StoreError::NotFound);
        }

        let key = (user.clone(), tenant);
        let outcome = match state.assignments.get_mut(&key) {
            Some(existing) if existing.is_active => {
                existing.role = role.clone();
                AssignmentOutcome::Updated
            }
            Some(existing) => {
                existing.role = role.clone();
                existing.is_active = true;
                existing.assigned_at = Utc::now();
                AssignmentOutcome::Reactivated
            }
            None => {
                state.assignments.insert(
                    key,
                    Assignment {
                        role: role.clone(),
                        is_active: true,
                        assigned_at: Utc::now(),
                    },
                );
                AssignmentOutcome::Created
            }
        };
        Ok(outcome)
    }

    async fn unassign_tenant_role(&self, user: &UserId, tenant: TenantId) -> StoreResult<()> {
        let mut state = self.write()?;
        let assignment = state
            .assignments
            .get_mut(&(user.clone(), tenant))
            .ok_or(StoreError::NotFound)?;
        assignment.is_active = false;
        Ok(())
    }

    async fn active_memberships(&self, user: &UserId) -> StoreResult<Vec<Membership>> {
        let state = self.read()?;
        let mut memberships: Vec<_> = state
            .assignments
            .iter()
            .filter(|((uid, _), a)| uid == user && a.is_active)
            .filter_map(|((_, tid), a)| {
                state.tenants.get(tid).map(|t| Membership {
                    tenant: t.clone(),
                    role: a.role.clone(),
                    assigned_at: a.assigned_at,
                })
            })
            .collect();
        memberships.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));
        Ok(memberships)
    }

    async fn tenant_members(&self, tenant: TenantId) -> StoreResult<Vec<TenantMember>> {
        let state = self.read()?;
        let mut members: Vec<_> = state
            .assignments
            .iter()
            .filter(|((_, tid), a)| *tid == tenant && a.is_active)
            .filter_map(|((uid, _), a)| {
                state.users.get(uid).map(|u| TenantMember {
                    user: u.clone(),
                    role: a.role.clone(),
                    assigned_at: a.assigned_at,
                })
            })
            .collect();
        members.sort_by(|a, b| a.user.email.cmp(&b.user.email));
        Ok(members)
    }
}
