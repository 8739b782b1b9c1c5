//! Listing query descriptor.
//!
//! A `JobQuery` is validated once at construction and immutable afterwards.
//! Raw request parameters go through [`JobQuery::from_params`], which reports
//! absent fields as `MissingParameter` and unparseable ones as `InvalidArgument`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Upper salary bound used when the caller gives none.
pub const DEFAULT_MAX_LIMIT: i64 = i64::MAX;

// ============================================================================
// Region
// ============================================================================

/// Province a posting is located in.
///
/// Closed set; parsing ignores case and accepts `-` for `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    Western,
    Central,
    Southern,
    Northern,
    Eastern,
    NorthWestern,
    NorthCentral,
    Uva,
    Sabaragamuwa,
}

impl Region {
    pub const ALL: &'static [Region] = &[
        Region::Western,
        Region::Central,
        Region::Southern,
        Region::Northern,
        Region::Eastern,
        Region::NorthWestern,
        Region::NorthCentral,
        Region::Uva,
        Region::Sabaragamuwa,
    ];

    /// Parse a region name, rejecting anything outside [`Region::ALL`].
    pub fn new(raw: impl AsRef<str>) -> ModelResult<Self> {
        raw.as_ref().parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Western => "western",
            Region::Central => "central",
            Region::Southern => "southern",
            Region::Northern => "northern",
            Region::Eastern => "eastern",
            Region::NorthWestern => "north_western",
            Region::NorthCentral => "north_central",
            Region::Uva => "uva",
            Region::Sabaragamuwa => "sabaragamuwa",
        }
    }
}

impl FromStr for Region {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug = s.trim().to_ascii_lowercase().replace('-', "_");
        if slug.is_empty() {
            return Err(ModelError::invalid("region cannot be empty"));
        }
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == slug)
            .ok_or_else(|| ModelError::invalid(format!("unknown region '{}'", s.trim())))
    }
}

impl TryFrom<String> for Region {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.as_str().to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region restriction of a listing query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegionFilter {
    /// No region filter.
    #[default]
    Entire,
    Only(Region),
}

impl FromStr for RegionFilter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "entire" | "all" => Ok(RegionFilter::Entire),
            other => other.parse().map(RegionFilter::Only),
        }
    }
}

// ============================================================================
// Sort
// ============================================================================

/// Listing sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Salary,
    Expiry,
    Distance,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Salary => "salary",
            SortBy::Expiry => "expiry",
            SortBy::Distance => "distance",
        }
    }

    /// Only salary ordering is served today.
    pub fn ensure_supported(self) -> ModelResult<Self> {
        match self {
            SortBy::Salary => Ok(self),
            other => Err(ModelError::UnsupportedFilter(format!(
                "sorting by {} is not available yet",
                other.as_str()
            ))),
        }
    }
}

impl FromStr for SortBy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "salary" => Ok(SortBy::Salary),
            "expiry" => Ok(SortBy::Expiry),
            "distance" => Ok(SortBy::Distance),
            other => Err(ModelError::UnsupportedFilter(format!(
                "sorting by '{}' is not available",
                other
            ))),
        }
    }
}

/// Sort direction for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Get the Firestore direction string.
    pub const fn firestore_direction(&self) -> &'static str {
        match self {
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(ModelError::invalid(format!("unknown sort order '{}'", other))),
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// Immutable, validated listing query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct JobQuery {
    min_limit: i64,
    max_limit: i64,
    region: RegionFilter,
    sort_by: SortBy,
    order: SortOrder,
    page_size: u32,
    page_index: u32,
}

impl JobQuery {
    pub fn builder() -> JobQueryBuilder {
        JobQueryBuilder::default()
    }

    /// Query without salary bounds, for callers that only pick region/sort/page.
    pub fn unbounded(
        region: RegionFilter,
        sort_by: SortBy,
        order: SortOrder,
        page_size: u32,
        page_index: u32,
    ) -> ModelResult<Self> {
        Self::builder()
            .min_limit(0)
            .region(region)
            .sort_by(sort_by)
            .order(order)
            .page_size(page_size)
            .page_index(page_index)
            .build()
    }

    /// Parse raw request parameters.
    pub fn from_params(params: &JobQueryParams) -> ModelResult<Self> {
        let mut builder = Self::builder();

        let min_limit = params
            .min_limit
            .as_deref()
            .ok_or_else(|| ModelError::missing("min_limit"))?;
        builder = builder.min_limit(parse_number("min_limit", min_limit)?);

        if let Some(raw) = params.max_limit.as_deref() {
            builder = builder.max_limit(parse_number("max_limit", raw)?);
        }
        if let Some(raw) = params.region.as_deref() {
            builder = builder.region(raw.parse()?);
        }

        let sort_by = params
            .sort_by
            .as_deref()
            .ok_or_else(|| ModelError::missing("sort_by"))?;
        builder = builder.sort_by(sort_by.parse()?);

        if let Some(raw) = params.order.as_deref() {
            builder = builder.order(raw.parse()?);
        }
        if let Some(raw) = params.page_size.as_deref() {
            builder = builder.page_size(parse_number("page_size", raw)?);
        }
        if let Some(raw) = params.page_index.as_deref() {
            builder = builder.page_index(parse_number("page_index", raw)?);
        }

        builder.build()
    }

    pub fn min_limit(&self) -> i64 {
        self.min_limit
    }

    pub fn max_limit(&self) -> i64 {
        self.max_limit
    }

    pub fn region(&self) -> &RegionFilter {
        &self.region
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> ModelResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ModelError::invalid(format!("{} must be an integer, got '{}'", name, raw)))
}

/// Builder fixing the listing defaults.
#[derive(Debug, Clone, Default)]
pub struct JobQueryBuilder {
    min_limit: Option<i64>,
    max_limit: Option<i64>,
    region: Option<RegionFilter>,
    sort_by: Option<SortBy>,
    order: Option<SortOrder>,
    page_size: Option<u32>,
    page_index: Option<u32>,
}

impl JobQueryBuilder {
    pub fn min_limit(mut self, value: i64) -> Self {
        self.min_limit = Some(value);
        self
    }

    pub fn max_limit(mut self, value: i64) -> Self {
        self.max_limit = Some(value);
        self
    }

    pub fn region(mut self, value: RegionFilter) -> Self {
        self.region = Some(value);
        self
    }

    pub fn sort_by(mut self, value: SortBy) -> Self {
        self.sort_by = Some(value);
        self
    }

    pub fn order(mut self, value: SortOrder) -> Self {
        self.order = Some(value);
        self
    }

    pub fn page_size(mut self, value: u32) -> Self {
        self.page_size = Some(value);
        self
    }

    pub fn page_index(mut self, value: u32) -> Self {
        self.page_index = Some(value);
        self
    }

    pub fn build(self) -> ModelResult<JobQuery> {
        let min_limit = self.min_limit.ok_or_else(|| ModelError::missing("min_limit"))?;
        let max_limit = self.max_limit.unwrap_or(DEFAULT_MAX_LIMIT);
        let sort_by = self
            .sort_by
            .ok_or_else(|| ModelError::missing("sort_by"))?
            .ensure_supported()?;

        if min_limit > max_limit {
            return Err(ModelError::invalid(format!(
                "min_limit ({}) exceeds max_limit ({})",
                min_limit, max_limit
            )));
        }

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ModelError::invalid(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(JobQuery {
            min_limit,
            max_limit,
            region: self.region.unwrap_or_default(),
            sort_by,
            order: self.order.unwrap_or_default(),
            page_size,
            page_index: self.page_index.unwrap_or(0),
        })
    }
}

/// Raw listing parameters as received from a request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQueryParams {
    #[serde(default)]
    pub min_limit: Option<String>,
    #[serde(default)]
    pub max_limit: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
    #[serde(default)]
    pub page_index: Option<String>,
}
