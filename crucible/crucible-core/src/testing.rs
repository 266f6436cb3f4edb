//! Fixtures shared by the unit tests.

use crate::auth::{IdentityPayload, IdentityProvider, STAFF_ROLE};
use crate::resource::{
    AuthConfig, InternalAuthConfig, LinkContent, LtiContent, NewResource, QuestionContent,
    ResourceContent, ResourceType, SmartQuizContent, SsoAuthConfig,
};
use crate::storage::ResourceStore;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Identity provider returning a fixed payload and counting lookups.
pub(crate) struct CountingIdentity {
    payload: Option<IdentityPayload>,
    calls: AtomicUsize,
}

impl CountingIdentity {
    fn with(payload: Option<IdentityPayload>) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn none() -> Self {
        Self::with(None)
    }

    pub(crate) fn student() -> Self {
        Self::with(Some(IdentityPayload {
            user: "s4412345".into(),
            role: "Student".into(),
            name: None,
            email: None,
        }))
    }

    pub(crate) fn staff() -> Self {
        Self::with(Some(IdentityPayload {
            user: "uqstaff".into(),
            role: STAFF_ROLE.into(),
            name: None,
            email: None,
        }))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for CountingIdentity {
    async fn resolve_identity(&self, _token: &str) -> Option<IdentityPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone()
    }
}

pub(crate) fn container(resource_type: ResourceType, label: &str, children: Vec<Uuid>) -> NewResource {
    NewResource::new(resource_type, label, ResourceContent::children_of(children))
}

pub(crate) fn link(label: &str) -> NewResource {
    NewResource::new(
        ResourceType::Url,
        label,
        ResourceContent::Link(LinkContent {
            url: format!("https://example.com/{}", label),
        }),
    )
}

pub(crate) fn lti(label: &str) -> NewResource {
    NewResource::new(
        ResourceType::ServiceExternalLti,
        label,
        ResourceContent::Lti(LtiContent {
            launch_url: "https://tool.example.com/launch".into(),
            consumer_key: "key".into(),
            secret: "shh".into(),
        }),
    )
}

pub(crate) fn question(label: &str, authored: bool) -> NewResource {
    let body = if authored {
        json!({"type": 0, "statement": label, "currentState": {"correctAnswerFound": false}})
    } else {
        json!({"type": 0, "statement": label})
    };
    let map = body.as_object().cloned().unwrap_or_default();
    NewResource::new(
        ResourceType::QuizQuestion,
        label,
        ResourceContent::Question(QuestionContent(map)),
    )
}

pub(crate) fn smart_quiz(label: &str, num_questions: u32) -> NewResource {
    NewResource::new(
        ResourceType::SmartQuiz,
        label,
        ResourceContent::SmartQuiz(SmartQuizContent {
            children: Vec::new(),
            num_questions,
            tags: Vec::new(),
        }),
    )
}

pub(crate) fn hidden(mut resource: NewResource) -> NewResource {
    resource
        .permissions
        .auth
        .get_or_insert_with(AuthConfig::default)
        .internal = Some(InternalAuthConfig { hidden: true });
    resource
}

pub(crate) fn sso_locked(mut resource: NewResource, staff_only: bool) -> NewResource {
    resource
        .permissions
        .auth
        .get_or_insert_with(AuthConfig::default)
        .sso = Some(SsoAuthConfig {
        basic: true,
        staff_only,
    });
    resource
}

pub(crate) async fn put(store: &dyn ResourceStore, resource: NewResource) -> Uuid {
    store.insert(resource).await.unwrap()
}

pub(crate) async fn children_of(store: &dyn ResourceStore, id: Uuid) -> Vec<Uuid> {
    let resource = store.get_by_id(id).await.unwrap().unwrap();
    resource.content.children().unwrap_or(&[]).to_vec()
}
