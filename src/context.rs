//! Per-request context carried through forwarding and logging.

use uuid::Uuid;

/// Query parameter carrying the business id.
pub const BIZ_ID_PARAM: &str = "openaiBizId";
/// Query parameter carrying the business type.
pub const BIZ_TYPE_PARAM: &str = "openaiBizType";

/// Business tags supplied by the caller on the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BizTags {
    pub biz_id: Option<String>,
    pub biz_type: Option<String>,
}

impl BizTags {
    /// Collect tags from decoded query pairs.
    ///
    /// Unrelated keys are ignored and a repeated key keeps its first value,
    /// so no query string can fail a request.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tags = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                BIZ_ID_PARAM if tags.biz_id.is_none() => tags.biz_id = Some(value),
                BIZ_TYPE_PARAM if tags.biz_type.is_none() => tags.biz_type = Some(value),
                _ => {}
            }
        }
        tags
    }
}

/// Context for a single forwarded request.
///
/// The business id and type are opaque tags used only to correlate log lines.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    biz_id: Option<String>,
    biz_type: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Fresh context with a random request id and no tags.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            biz_id: None,
            biz_type: None,
        }
    }

    pub fn from_tags(tags: BizTags) -> Self {
        Self {
            biz_id: tags.biz_id,
            biz_type: tags.biz_type,
            ..Self::new()
        }
    }

    pub fn with_biz_id(mut self, biz_id: impl Into<String>) -> Self {
        self.biz_id = Some(biz_id.into());
        self
    }

    pub fn with_biz_type(mut self, biz_type: impl Into<String>) -> Self {
        self.biz_type = Some(biz_type.into());
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Business id, or `""` when the caller supplied none.
    pub fn biz_id(&self) -> &str {
        self.biz_id.as_deref().unwrap_or("")
    }

    /// Business type, or `""` when the caller supplied none.
    pub fn biz_type(&self) -> &str {
        self.biz_type.as_deref().unwrap_or("")
    }

    /// Span whose fields tag every event recorded inside it.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "proxy_request",
            request_id = %self.request_id,
            biz_id = self.biz_id(),
            biz_type = self.biz_type(),
        )
    }
}
