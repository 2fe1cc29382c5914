//! API constants

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v1";

/// Versioned prefix every domain route is nested under.
pub const API_PREFIX: &str = "/api/v1";

/// Path of the served OpenAPI document.
pub const OPENAPI_PATH: &str = "/api/openapi.json";
