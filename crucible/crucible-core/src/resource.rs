//! Resource documents: the single entity type stored in the hub.
//!
//! Every resource carries a numeric `type` discriminant and a `content`
//! payload whose shape depends on that type. The payload is parsed into
//! [`ResourceContent`] as soon as it enters the system so consumers match
//! on a closed enum instead of probing JSON.

use crate::error::{ResourceError, ResourceResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kinds of resources managed by the store. Wire codes must never change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u16", into = "u16")]
pub enum ResourceType {
    Null,
    CollectionRoot,
    Collection,
    TopicBundle,
    SmartQuiz,
    DocumentInternal,
    DocumentExternal,
    Url,
    VideoInternal,
    VideoExternal,
    VideoExternalKaltura,
    InlineDocumentInternal,
    ServiceExternalLti,
    QuizUqChem,
    QuizQuestion,
}

impl ResourceType {
    pub const ALL: [ResourceType; 15] = [
        ResourceType::Null,
        ResourceType::CollectionRoot,
        ResourceType::Collection,
        ResourceType::TopicBundle,
        ResourceType::SmartQuiz,
        ResourceType::DocumentInternal,
        ResourceType::DocumentExternal,
        ResourceType::Url,
        ResourceType::VideoInternal,
        ResourceType::VideoExternal,
        ResourceType::VideoExternalKaltura,
        ResourceType::InlineDocumentInternal,
        ResourceType::ServiceExternalLti,
        ResourceType::QuizUqChem,
        ResourceType::QuizQuestion,
    ];

    pub fn code(self) -> u16 {
        match self {
            ResourceType::Null => 0,
            ResourceType::CollectionRoot => 1,
            ResourceType::Collection => 2,
            ResourceType::TopicBundle => 3,
            ResourceType::SmartQuiz => 4,
            ResourceType::DocumentInternal => 10,
            ResourceType::DocumentExternal => 11,
            ResourceType::Url => 20,
            ResourceType::VideoInternal => 50,
            ResourceType::VideoExternal => 51,
            ResourceType::VideoExternalKaltura => 52,
            ResourceType::InlineDocumentInternal => 60,
            ResourceType::ServiceExternalLti => 70,
            ResourceType::QuizUqChem => 100,
            ResourceType::QuizQuestion => 101,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Null => "NULL",
            ResourceType::CollectionRoot => "RESOURCE_COLLECTION_ROOT",
            ResourceType::Collection => "RESOURCE_COLLECTION",
            ResourceType::TopicBundle => "RESOURCE_COLLECTION_TOPIC_BUNDLE",
            ResourceType::SmartQuiz => "RESOURCE_COLLECTION_SMART_QUIZ",
            ResourceType::DocumentInternal => "DOCUMENT_INTERNAL",
            ResourceType::DocumentExternal => "DOCUMENT_EXTERNAL",
            ResourceType::Url => "URL",
            ResourceType::VideoInternal => "VIDEO_INTERNAL",
            ResourceType::VideoExternal => "VIDEO_EXTERNAL",
            ResourceType::VideoExternalKaltura => "VIDEO_EXTERNAL_KALTURA",
            ResourceType::InlineDocumentInternal => "RESOURCE_EXPLORER_INLINE_DOCUMENT_INTERNAL",
            ResourceType::ServiceExternalLti => "SERVICE_EXTERNAL_LTI",
            ResourceType::QuizUqChem => "QUIZ_UQ_CHEM",
            ResourceType::QuizQuestion => "QUIZ_QUESTION",
        }
    }

    /// Collections that may appear as hops in a resource path.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            ResourceType::CollectionRoot
                | ResourceType::Collection
                | ResourceType::TopicBundle
                | ResourceType::SmartQuiz
        )
    }

    /// Containers whose `children` are owned: copied and deleted with them.
    pub fn owns_children(self) -> bool {
        matches!(
            self,
            ResourceType::CollectionRoot
                | ResourceType::Collection
                | ResourceType::TopicBundle
                | ResourceType::QuizUqChem
        )
    }

    pub fn is_root(self) -> bool {
        self == ResourceType::CollectionRoot
    }

    /// Third-party keyed integrations; admin sessions never unlock these.
    pub fn is_external_lti(self) -> bool {
        self == ResourceType::ServiceExternalLti
    }
}

impl TryFrom<u16> for ResourceType {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown resource type {}", code))
    }
}

impl From<ResourceType> for u16 {
    fn from(t: ResourceType) -> Self {
        t.code()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailSize {
    Contain,
    Cover,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnail {
    pub url: String,
    pub size: ThumbnailSize,
}

/// Auth mechanisms in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    Internal,
    Sso,
}

impl AuthMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMechanism::Internal => "internal",
            AuthMechanism::Sso => "uqsso",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InternalAuthConfig {
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SsoAuthConfig {
    #[serde(default)]
    pub basic: bool,
    #[serde(default)]
    pub staff_only: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<InternalAuthConfig>,
    #[serde(default, rename = "uqsso", skip_serializing_if = "Option::is_none")]
    pub sso: Option<SsoAuthConfig>,
}

/// Stored permission settings. There is no lock flag here: the
/// lock state is derived per request and only ever appears on a view.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildList {
    #[serde(default)]
    pub children: Vec<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SmartQuizContent {
    /// Snapshot only; the sampler never trusts it.
    #[serde(default)]
    pub children: Vec<Uuid>,
    pub num_questions: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HtmlContent {
    pub html: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkContent {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_relative_path: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LtiContent {
    pub launch_url: String,
    pub consumer_key: String,
    pub secret: String,
}

/// Authored question body. Its inner structure belongs to the quiz editor.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct QuestionContent(pub Map<String, Value>);

impl QuestionContent {
    /// Fully authored questions carry a non-empty `currentState`; drafts don't.
    pub fn has_current_state(&self) -> bool {
        match self.0.get("currentState") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().map_or(false, |v| v != 0.0),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Bool(true)) => true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmptyContent {}

/// Type-specific payload of a resource.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ResourceContent {
    Empty(EmptyContent),
    Children(ChildList),
    SmartQuiz(SmartQuizContent),
    Html(HtmlContent),
    Link(LinkContent),
    Video(VideoContent),
    Lti(LtiContent),
    Question(QuestionContent),
}

impl ResourceContent {
    pub fn empty() -> Self {
        ResourceContent::Empty(EmptyContent {})
    }

    pub fn children_of(ids: Vec<Uuid>) -> Self {
        ResourceContent::Children(ChildList { children: ids })
    }

    /// Parse a raw payload against the shape required by `resource_type`.
    pub fn parse(resource_type: ResourceType, value: Value) -> ResourceResult<Self> {
        fn decode<T: serde::de::DeserializeOwned>(
            resource_type: ResourceType,
            value: Value,
        ) -> ResourceResult<T> {
            serde_json::from_value(value).map_err(|e| {
                ResourceError::validation(format!(
                    "Resource content does not match type {}: {}",
                    resource_type.as_str(),
                    e
                ))
            })
        }

        let content = match resource_type {
            ResourceType::Null => ResourceContent::Empty(decode(resource_type, value)?),
            ResourceType::CollectionRoot
            | ResourceType::Collection
            | ResourceType::TopicBundle
            | ResourceType::QuizUqChem => ResourceContent::Children(decode(resource_type, value)?),
            ResourceType::SmartQuiz => ResourceContent::SmartQuiz(decode(resource_type, value)?),
            ResourceType::DocumentInternal | ResourceType::InlineDocumentInternal => {
                ResourceContent::Html(decode(resource_type, value)?)
            }
            ResourceType::DocumentExternal
            | ResourceType::Url
            | ResourceType::VideoExternal
            | ResourceType::VideoExternalKaltura => {
                ResourceContent::Link(decode(resource_type, value)?)
            }
            ResourceType::VideoInternal => ResourceContent::Video(decode(resource_type, value)?),
            ResourceType::ServiceExternalLti => ResourceContent::Lti(decode(resource_type, value)?),
            ResourceType::QuizQuestion => ResourceContent::Question(decode(resource_type, value)?),
        };
        Ok(content)
    }

    pub fn children(&self) -> Option<&[Uuid]> {
        match self {
            ResourceContent::Children(c) => Some(&c.children),
            ResourceContent::SmartQuiz(q) => Some(&q.children),
            ResourceContent::Empty(_)
            | ResourceContent::Html(_)
            | ResourceContent::Link(_)
            | ResourceContent::Video(_)
            | ResourceContent::Lti(_)
            | ResourceContent::Question(_) => None,
        }
    }

    pub fn contains_child(&self, id: Uuid) -> bool {
        self.children().map_or(false, |c| c.contains(&id))
    }

    /// Copy of this content with `id` dropped from `children`; the
    /// remaining ids keep their relative order.
    pub fn without_child(&self, id: Uuid) -> ResourceContent {
        let mut out = self.clone();
        match &mut out {
            ResourceContent::Children(c) => c.children.retain(|c| *c != id),
            ResourceContent::SmartQuiz(q) => q.children.retain(|c| *c != id),
            _ => {}
        }
        out
    }

    pub fn set_children(&mut self, ids: Vec<Uuid>) {
        match self {
            ResourceContent::Children(c) => c.children = ids,
            ResourceContent::SmartQuiz(q) => q.children = ids,
            _ => {}
        }
    }
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Wire shape shared by stored documents and client input.
#[derive(Deserialize)]
struct RawResource {
    #[serde(rename = "_id", default)]
    id: Option<Uuid>,
    #[serde(rename = "type")]
    resource_type: ResourceType,
    label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
    #[serde(default, deserialize_with = "null_as_default")]
    permissions: Permissions,
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Serialize)]
struct ResourceRef<'a> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(rename = "type")]
    resource_type: ResourceType,
    label: &'a str,
    tags: &'a [String],
    thumbnail: &'a Option<Thumbnail>,
    permissions: &'a Permissions,
    content: &'a ResourceContent,
}

/// A resource before the store has assigned it an id.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawResource")]
pub struct NewResource {
    pub resource_type: ResourceType,
    pub label: String,
    pub tags: Vec<String>,
    pub thumbnail: Option<Thumbnail>,
    pub permissions: Permissions,
    pub content: ResourceContent,
}

impl NewResource {
    pub fn new(resource_type: ResourceType, label: impl Into<String>, content: ResourceContent) -> Self {
        Self {
            resource_type,
            label: label.into(),
            tags: Vec::new(),
            thumbnail: None,
            permissions: Permissions::default(),
            content,
        }
    }

    pub fn with_id(self, id: Uuid) -> Resource {
        Resource {
            id,
            resource_type: self.resource_type,
            label: self.label,
            tags: self.tags,
            thumbnail: self.thumbnail,
            permissions: self.permissions,
            content: self.content,
        }
    }
}

impl TryFrom<RawResource> for NewResource {
    type Error = ResourceError;

    fn try_from(raw: RawResource) -> Result<Self, Self::Error> {
        let content = ResourceContent::parse(
            raw.resource_type,
            raw.content.unwrap_or_else(|| Value::Object(Map::new())),
        )?;
        Ok(Self {
            resource_type: raw.resource_type,
            label: raw.label,
            tags: raw.tags,
            thumbnail: raw.thumbnail,
            permissions: raw.permissions,
            content,
        })
    }
}

impl Serialize for NewResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResourceRef {
            id: None,
            resource_type: self.resource_type,
            label: &self.label,
            tags: &self.tags,
            thumbnail: &self.thumbnail,
            permissions: &self.permissions,
            content: &self.content,
        }
        .serialize(serializer)
    }
}

/// A stored resource.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawResource")]
pub struct Resource {
    pub id: Uuid,
    pub resource_type: ResourceType,
    pub label: String,
    pub tags: Vec<String>,
    pub thumbnail: Option<Thumbnail>,
    pub permissions: Permissions,
    pub content: ResourceContent,
}

impl Resource {
    pub fn is_collection(&self) -> bool {
        self.resource_type.is_collection()
    }

    pub fn owns_children(&self) -> bool {
        self.resource_type.owns_children()
    }

    /// Anything carrying a `children` list, owned or cached.
    pub fn is_container(&self) -> bool {
        self.owns_children() || self.resource_type == ResourceType::SmartQuiz
    }

    /// Owned child ids, empty for anything that is not an owning container.
    pub fn owned_children(&self) -> &[Uuid] {
        if !self.owns_children() {
            return &[];
        }
        self.content.children().unwrap_or(&[])
    }

    /// Strip the id so the resource can be inserted again as a copy.
    pub fn to_new(&self) -> NewResource {
        NewResource {
            resource_type: self.resource_type,
            label: self.label.clone(),
            tags: self.tags.clone(),
            thumbnail: self.thumbnail.clone(),
            permissions: self.permissions.clone(),
            content: self.content.clone(),
        }
    }

    pub fn apply(&mut self, update: ResourceUpdate) {
        if let Some(label) = update.label {
            self.label = label;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(thumbnail) = update.thumbnail {
            self.thumbnail = thumbnail;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
    }
}

impl TryFrom<RawResource> for Resource {
    type Error = ResourceError;

    fn try_from(mut raw: RawResource) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .take()
            .ok_or_else(|| ResourceError::validation("Stored resource has no _id"))?;
        Ok(NewResource::try_from(raw)?.with_id(id))
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResourceRef {
            id: Some(self.id),
            resource_type: self.resource_type,
            label: &self.label,
            tags: &self.tags,
            thumbnail: &self.thumbnail,
            permissions: &self.permissions,
            content: &self.content,
        }
        .serialize(serializer)
    }
}

/// Partial update as submitted by a caller. `_id`, `_currentlyLocked` and any
/// other unknown keys are dropped during deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResourcePatch {
    #[serde(rename = "type", default)]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub thumbnail: Option<Option<Thumbnail>>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub content: Option<Value>,
}

impl ResourcePatch {
    /// Check the patch against the stored type and parse its content.
    pub fn validate(self, stored_type: ResourceType) -> ResourceResult<ResourceUpdate> {
        if let Some(t) = self.resource_type {
            if t != stored_type {
                return Err(ResourceError::validation(format!(
                    "Resource type is immutable ({} cannot become {})",
                    stored_type.as_str(),
                    t.as_str()
                )));
            }
        }
        let content = self
            .content
            .map(|value| ResourceContent::parse(stored_type, value))
            .transpose()?;
        Ok(ResourceUpdate {
            label: self.label,
            tags: self.tags,
            thumbnail: self.thumbnail,
            permissions: self.permissions,
            content,
        })
    }
}

/// Validated partial update handed to the store. It has no id field, so an
/// update can never rewrite a resource's identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceUpdate {
    pub label: Option<String>,
    pub tags: Option<Vec<String>>,
    pub thumbnail: Option<Option<Thumbnail>>,
    pub permissions: Option<Permissions>,
    pub content: Option<ResourceContent>,
}

impl ResourceUpdate {
    pub fn content(content: ResourceContent) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PermissionsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(rename = "_currentlyLocked")]
    pub currently_locked: bool,
}

/// Response-only rendering of a resource with its derived lock flag.
#[derive(Clone, Debug, Serialize)]
pub struct ResourceView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub label: String,
    pub tags: Vec<String>,
    pub thumbnail: Option<Thumbnail>,
    pub permissions: PermissionsView,
    pub content: ResourceContent,
}

impl ResourceView {
    /// Build a view; with `redact` set the payload is replaced by `{}` while
    /// label, type, tags and thumbnail stay visible.
    pub fn new(resource: Resource, locked: bool, redact: bool) -> Self {
        let content = if redact {
            ResourceContent::empty()
        } else {
            resource.content
        };
        Self {
            id: resource.id,
            resource_type: resource.resource_type,
            label: resource.label,
            tags: resource.tags,
            thumbnail: resource.thumbnail,
            permissions: PermissionsView {
                auth: resource.permissions.auth,
                currently_locked: locked,
            },
            content,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.permissions.currently_locked
    }
}
