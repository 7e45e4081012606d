//! Shared XML vocabulary: namespaces, property URIs, and the category
//! schemes used by the Atom rendition. Every codec reads and writes these
//! through the same constants so the vocabularies cannot drift apart.

/// Object/datastream model property namespace.
pub const MODEL_NS: &str = "info:dor/dor-system:def/model#";

/// Access-view property namespace.
pub const VIEW_NS: &str = "info:dor/dor-system:def/view#";

/// Audit-trail vocabulary namespace.
pub const AUDIT_NS: &str = "info:dor/dor-system:def/audit#";

/// Atom threading extension namespace (`thr:in-reply-to`).
pub const THREAD_NS: &str = "http://purl.org/syndication/thread/1.0";

pub const PROP_STATE: &str = "info:dor/dor-system:def/model#state";
pub const PROP_LABEL: &str = "info:dor/dor-system:def/model#label";
pub const PROP_OWNER_ID: &str = "info:dor/dor-system:def/model#ownerId";
pub const PROP_CREATED_DATE: &str = "info:dor/dor-system:def/model#createdDate";
pub const PROP_LAST_MODIFIED_DATE: &str = "info:dor/dor-system:def/view#lastModifiedDate";

// Category schemes carried on Atom datastream/version entries.
pub const CAT_CONTROL_GROUP: &str = "info:dor/dor-system:def/model#controlGroup";
pub const CAT_VERSIONABLE: &str = "info:dor/dor-system:def/model#versionable";
pub const CAT_FORMAT_URI: &str = "info:dor/dor-system:def/model#formatURI";
pub const CAT_ALT_IDS: &str = "info:dor/dor-system:def/model#altIds";
pub const CAT_DIGEST_TYPE: &str = "info:dor/dor-system:def/model#digestType";
pub const CAT_DIGEST: &str = "info:dor/dor-system:def/model#digest";
pub const CAT_LENGTH: &str = "info:dor/dor-system:def/model#length";
