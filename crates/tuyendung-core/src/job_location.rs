//! Canonical location for a job posting.
//!
//! The backend hands out job records whose location can live in several
//! places at once: flat `*_code` fields, nested `{ code, name }` objects, an
//! `address` object holding either form, and the same set again under the
//! posting's `recruiter`. [`resolve_job_location`] picks one province and one
//! ward out of all that by walking fixed priority chains ([`CodePath`],
//! [`NamePath`]) and composes a display label from the result.
//!
//! Every output field is resolved on its own. A record may yield a ward
//! without a province and the two never have to come from the same source.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::{AdminCode, GeoLookup, LookupTable};

/// Separator between ward and province in a composed label.
const LABEL_SEPARATOR: &str = ", ";

/// Reads a field, treating any value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`], for nested objects. serde would otherwise accept a JSON
/// array as a struct in field order.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// A nested `{ code, name }` object, e.g. `job.province`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// The `address` object of a job or recruiter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    #[serde(default, deserialize_with = "lenient")]
    pub province_code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient")]
    pub ward_code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub province: Option<UnitRef>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub ward: Option<UnitRef>,
}

/// The recruiter embedded in a job record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterFields {
    #[serde(default, deserialize_with = "lenient_object")]
    pub address: Option<AddressFields>,
    #[serde(default, deserialize_with = "lenient")]
    pub province_code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient")]
    pub ward_code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub province: Option<UnitRef>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub ward: Option<UnitRef>,
}

/// The location-bearing subset of a job record. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLocationSource {
    #[serde(default, deserialize_with = "lenient_object")]
    pub address: Option<AddressFields>,
    #[serde(default, deserialize_with = "lenient")]
    pub province_code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient")]
    pub ward_code: Option<AdminCode>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub province: Option<UnitRef>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub ward: Option<UnitRef>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub recruiter: Option<RecruiterFields>,
}

impl JobLocationSource {
    /// Reads a raw job record. Anything that is not a JSON object reads as an
    /// empty record.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Which administrative level a lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Province,
    Ward,
}

impl Axis {
    fn table(self, lookup: &GeoLookup) -> &LookupTable {
        match self {
            Axis::Province => &lookup.provinces,
            Axis::Ward => &lookup.wards,
        }
    }
}

/// The `province_code`/`ward_code`/`province`/`ward` quartet shared by a job,
/// its address, and its recruiter.
trait LocationFields {
    fn flat_code(&self, axis: Axis) -> Option<&AdminCode>;
    fn unit(&self, axis: Axis) -> Option<&UnitRef>;
}

macro_rules! impl_location_fields {
    ($($ty:ty),+) => {
        $(
            impl LocationFields for $ty {
                fn flat_code(&self, axis: Axis) -> Option<&AdminCode> {
                    match axis {
                        Axis::Province => self.province_code.as_ref(),
                        Axis::Ward => self.ward_code.as_ref(),
                    }
                }

                fn unit(&self, axis: Axis) -> Option<&UnitRef> {
                    match axis {
                        Axis::Province => self.province.as_ref(),
                        Axis::Ward => self.ward.as_ref(),
                    }
                }
            }
        )+
    };
}

impl_location_fields!(AddressFields, RecruiterFields, JobLocationSource);

fn nested_code<'a>(fields: &'a impl LocationFields, axis: Axis) -> Option<&'a AdminCode> {
    fields.unit(axis)?.code.as_ref()
}

fn nested_name<'a>(fields: &'a impl LocationFields, axis: Axis) -> Option<&'a str> {
    fields.unit(axis)?.name.as_deref()
}

/// Places a code can be read from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePath {
    /// `address.province_code`
    AddressFlat,
    /// `address.province.code`
    AddressNested,
    /// `province.code`
    Nested,
    /// `province_code`
    Flat,
    /// `recruiter.address.province_code`
    RecruiterAddressFlat,
    /// `recruiter.address.province.code`
    RecruiterAddressNested,
    /// `recruiter.province.code`
    RecruiterNested,
    /// `recruiter.province_code`
    RecruiterFlat,
}

impl CodePath {
    pub const PRIORITY: [CodePath; 8] = [
        CodePath::AddressFlat,
        CodePath::AddressNested,
        CodePath::Nested,
        CodePath::Flat,
        CodePath::RecruiterAddressFlat,
        CodePath::RecruiterAddressNested,
        CodePath::RecruiterNested,
        CodePath::RecruiterFlat,
    ];

    /// Reads this path for the given axis (the doc paths above show the
    /// province form; ward paths are symmetric).
    #[must_use]
    pub fn read(self, job: &JobLocationSource, axis: Axis) -> Option<&AdminCode> {
        match self {
            CodePath::AddressFlat => job.address.as_ref()?.flat_code(axis),
            CodePath::AddressNested => nested_code(job.address.as_ref()?, axis),
            CodePath::Nested => nested_code(job, axis),
            CodePath::Flat => job.flat_code(axis),
            CodePath::RecruiterAddressFlat => {
                job.recruiter.as_ref()?.address.as_ref()?.flat_code(axis)
            }
            CodePath::RecruiterAddressNested => {
                nested_code(job.recruiter.as_ref()?.address.as_ref()?, axis)
            }
            CodePath::RecruiterNested => nested_code(job.recruiter.as_ref()?, axis),
            CodePath::RecruiterFlat => job.recruiter.as_ref()?.flat_code(axis),
        }
    }
}

/// Places an explicit name can be read from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePath {
    /// `address.province.name`
    AddressNested,
    /// `province.name`
    Nested,
    /// `recruiter.address.province.name`
    RecruiterAddressNested,
    /// `recruiter.province.name`
    RecruiterNested,
}

impl NamePath {
    pub const PRIORITY: [NamePath; 4] = [
        NamePath::AddressNested,
        NamePath::Nested,
        NamePath::RecruiterAddressNested,
        NamePath::RecruiterNested,
    ];

    #[must_use]
    pub fn read(self, job: &JobLocationSource, axis: Axis) -> Option<&str> {
        match self {
            NamePath::AddressNested => nested_name(job.address.as_ref()?, axis),
            NamePath::Nested => nested_name(job, axis),
            NamePath::RecruiterAddressNested => {
                nested_name(job.recruiter.as_ref()?.address.as_ref()?, axis)
            }
            NamePath::RecruiterNested => nested_name(job.recruiter.as_ref()?, axis),
        }
    }
}

/// First present code along [`CodePath::PRIORITY`].
///
/// Absent values and blank strings are skipped. Anything else, including `0`
/// and `false`, is returned unchanged.
#[must_use]
pub fn first_code(job: &JobLocationSource, axis: Axis) -> Option<&AdminCode> {
    CodePath::PRIORITY
        .iter()
        .filter_map(|path| path.read(job, axis))
        .find(|code| !code.is_blank())
}

/// First non-blank explicit name along [`NamePath::PRIORITY`].
#[must_use]
pub fn first_name(job: &JobLocationSource, axis: Axis) -> Option<&str> {
    NamePath::PRIORITY
        .iter()
        .filter_map(|path| path.read(job, axis))
        .find(|name| !name.trim().is_empty())
}

/// Joins the present names, ward first. `None` when both are absent.
#[must_use]
pub fn compose_label(ward_name: Option<&str>, province_name: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [ward_name, province_name].into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(LABEL_SEPARATOR))
    }
}

/// Resolved location of one job record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLocation {
    pub province_code: Option<AdminCode>,
    pub ward_code: Option<AdminCode>,
    pub province_name: Option<String>,
    pub ward_name: Option<String>,
    pub label: Option<String>,
}

impl JobLocation {
    /// The label, or `fallback` when nothing could be resolved.
    #[must_use]
    pub fn label_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(fallback)
    }

    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.province_code.is_none()
            && self.ward_code.is_none()
            && self.province_name.is_none()
            && self.ward_name.is_none()
    }
}

/// Resolves `job` against the given lookup tables.
///
/// Codes come only from the record. A name comes from the record if any name
/// path has one, otherwise from the lookup table keyed by the code resolved
/// for the same axis.
#[must_use]
pub fn resolve_job_location(job: &JobLocationSource, lookup: &GeoLookup) -> JobLocation {
    let province_code = first_code(job, Axis::Province).cloned();
    let ward_code = first_code(job, Axis::Ward).cloned();

    let name_for = |axis: Axis, code: Option<&AdminCode>| -> Option<String> {
        first_name(job, axis)
            .or_else(|| code.and_then(|c| axis.table(lookup).get(c)))
            .map(str::to_owned)
    };
    let province_name = name_for(Axis::Province, province_code.as_ref());
    let ward_name = name_for(Axis::Ward, ward_code.as_ref());

    let label = compose_label(ward_name.as_deref(), province_name.as_deref());

    JobLocation {
        province_code,
        ward_code,
        province_name,
        ward_name,
        label,
    }
}

/// Resolver bound to one lookup snapshot.
#[derive(Debug, Clone, Copy)]
pub struct JobLocationResolver<'a> {
    lookup: &'a GeoLookup,
}

impl<'a> JobLocationResolver<'a> {
    #[must_use]
    pub fn new(lookup: &'a GeoLookup) -> Self {
        Self { lookup }
    }

    #[must_use]
    pub fn resolve(&self, job: &JobLocationSource) -> JobLocation {
        resolve_job_location(job, self.lookup)
    }

    /// Resolves raw JSON records, preserving input order.
    pub fn resolve_values<I>(&self, jobs: I) -> Vec<JobLocation>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        jobs.into_iter()
            .map(|value| self.resolve(&JobLocationSource::from_json(value)))
            .collect()
    }
}

#[cfg(test)]
#[path = "job_location_test.rs"]
mod tests;
