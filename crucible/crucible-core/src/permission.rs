//! Content locking based on the auth configuration embedded in a resource.

use crate::auth::{CallerContext, IdentityPayload, IdentityProvider};
use crate::resource::{AuthMechanism, Resource, ResourceView};
use std::collections::HashMap;

/// Identity lookups already performed during one evaluation batch, keyed by
/// mechanism. Create one per call; never share it between requests.
#[derive(Debug, Default)]
pub struct AuthResultCache {
    entries: HashMap<AuthMechanism, Option<IdentityPayload>>,
}

impl AuthResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn sso_identity(
        &mut self,
        caller: &CallerContext,
        identity: &dyn IdentityProvider,
    ) -> Option<&IdentityPayload> {
        if !self.entries.contains_key(&AuthMechanism::Sso) {
            let payload = lookup_sso(caller, identity).await;
            self.entries.insert(AuthMechanism::Sso, payload);
        }
        self.entries.get(&AuthMechanism::Sso).and_then(Option::as_ref)
    }
}

async fn lookup_sso(caller: &CallerContext, identity: &dyn IdentityProvider) -> Option<IdentityPayload> {
    let token = caller.sso_token.as_deref()?;
    identity.resolve_identity(token).await
}

/// Whether `resource` is locked for `caller`, ignoring admin status.
///
/// Mechanisms are checked in priority order and the first one that locks
/// wins: the internal `hidden` switch, then the SSO session requirement
/// (optionally restricted to staff). Without a cache every SSO-protected
/// resource costs one identity lookup.
pub async fn is_locked(
    resource: &Resource,
    caller: &CallerContext,
    identity: &dyn IdentityProvider,
    cache: Option<&mut AuthResultCache>,
) -> bool {
    let Some(auth) = resource.permissions.auth.as_ref() else {
        return false;
    };

    if auth.internal.as_ref().map_or(false, |c| c.hidden) {
        return true;
    }

    if let Some(sso) = auth.sso.as_ref().filter(|c| c.basic) {
        let staff = match cache {
            Some(cache) => cache.sso_identity(caller, identity).await.map(|p| p.is_staff()),
            None => lookup_sso(caller, identity).await.map(|p| p.is_staff()),
        };
        match staff {
            None => return true,
            Some(false) if sso.staff_only => return true,
            Some(_) => {}
        }
    }

    false
}

/// Evaluates lock state for one call, sharing identity lookups across every
/// resource it is asked about.
pub struct PermissionEvaluator<'a> {
    caller: &'a CallerContext,
    identity: &'a dyn IdentityProvider,
    cache: AuthResultCache,
}

impl<'a> PermissionEvaluator<'a> {
    pub fn new(caller: &'a CallerContext, identity: &'a dyn IdentityProvider) -> Self {
        Self {
            caller,
            identity,
            cache: AuthResultCache::new(),
        }
    }

    pub fn caller(&self) -> &CallerContext {
        self.caller
    }

    pub async fn is_locked(&mut self, resource: &Resource) -> bool {
        is_locked(resource, self.caller, self.identity, Some(&mut self.cache)).await
    }

    /// Lock state with the admin rule applied: admins see everything except
    /// LTI tools, which are always evaluated.
    pub async fn lock_state(&mut self, resource: &Resource) -> bool {
        if self.caller.is_admin() && !resource.resource_type.is_external_lti() {
            return false;
        }
        self.is_locked(resource).await
    }

    /// Render `resource` with its lock flag; locked content is emptied.
    pub async fn view(&mut self, resource: Resource) -> ResourceView {
        let locked = self.lock_state(&resource).await;
        ResourceView::new(resource, locked, locked)
    }
}
