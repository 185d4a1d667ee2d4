use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{CollectionPath, Document, DocumentPath, FieldValue, Fields};

pub const JOBS_COLLECTION: &str = "jobs";
pub const APPLICATIONS_COLLECTION: &str = "applications";
pub const USERS_COLLECTION: &str = "users";
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// Shown when a job has neither district nor state
pub const LOCATION_PLACEHOLDER: &str = "Location N/A";

/// Shown when a job has no title
pub const DEFAULT_JOB_TITLE: &str = "New Job Posted";

/// Field names of the job schema
pub mod job_fields {
    pub const TITLE: &str = "title";
    pub const COMPANY: &str = "company";
    pub const STATE: &str = "state";
    pub const DISTRICT: &str = "district";
    pub const JOB_TYPE: &str = "jobType";
    pub const EXPIRES_AT: &str = "expiresAt";
    pub const POSTER_ID: &str = "posterId";
}

/// Field name holding a user's delivery token
pub const FCM_TOKEN_FIELD: &str = "fcmToken";

pub fn jobs() -> CollectionPath {
    CollectionPath::root(JOBS_COLLECTION)
}

pub fn job_path(job_id: &str) -> DocumentPath {
    jobs().doc(job_id)
}

pub fn applications_of(job_id: &str) -> CollectionPath {
    job_path(job_id).collection(APPLICATIONS_COLLECTION)
}

pub fn user_path(user_id: &str) -> DocumentPath {
    CollectionPath::root(USERS_COLLECTION).doc(user_id)
}

pub fn notifications() -> CollectionPath {
    CollectionPath::root(NOTIFICATIONS_COLLECTION)
}

/// Category tag carried in push data and history records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// A job was posted
    NewJob,
    /// Someone applied to a job
    Application,
    /// A job expires soon
    ExpirationWarning,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::NewJob => "new_job",
            NotificationCategory::Application => "application",
            NotificationCategory::ExpirationWarning => "expiration_warning",
        }
    }
}

fn non_empty(fields: &Fields, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(FieldValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Job posting, read and deleted here but owned by the posting flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub job_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub poster_id: Option<String>,
}

impl JobRecord {
    pub fn from_fields(id: &str, fields: &Fields) -> Self {
        Self {
            id: id.to_string(),
            title: non_empty(fields, job_fields::TITLE),
            company: non_empty(fields, job_fields::COMPANY),
            state: non_empty(fields, job_fields::STATE),
            district: non_empty(fields, job_fields::DISTRICT),
            job_type: non_empty(fields, job_fields::JOB_TYPE),
            expires_at: fields
                .get(job_fields::EXPIRES_AT)
                .and_then(FieldValue::as_timestamp),
            poster_id: non_empty(fields, job_fields::POSTER_ID),
        }
    }

    pub fn from_document(doc: &Document) -> Self {
        Self::from_fields(doc.id(), &doc.fields)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_JOB_TITLE)
    }

    /// "District, State", whichever one exists, or the placeholder
    pub fn location(&self) -> String {
        format_location(
            self.district.as_deref().unwrap_or_default(),
            self.state.as_deref().unwrap_or_default(),
        )
    }

    /// Body of the new-job broadcast: "{location} • {jobType}"
    pub fn summary(&self) -> String {
        format!(
            "{} • {}",
            self.location(),
            self.job_type.as_deref().unwrap_or_default()
        )
    }
}

pub fn format_location(district: &str, state: &str) -> String {
    match (district.is_empty(), state.is_empty()) {
        (false, false) => format!("{}, {}", district, state),
        (false, true) => district.to_string(),
        (true, false) => state.to_string(),
        (true, true) => LOCATION_PLACEHOLDER.to_string(),
    }
}

/// Poster of a job; only the delivery token matters here
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub fcm_token: Option<String>,
}

impl UserRecord {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id().to_string(),
            fcm_token: non_empty(&doc.fields, FCM_TOKEN_FIELD),
        }
    }
}

/// Audit entry written for every new-job broadcast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationHistoryRecord {
    pub title: String,
    pub job_id: String,
    pub job_type: String,
    pub state: String,
    pub district: String,
    pub company: String,
    pub body: String,
    pub category: NotificationCategory,
}

impl NotificationHistoryRecord {
    pub fn for_new_job(job: &JobRecord) -> Self {
        Self {
            title: job.display_title().to_string(),
            job_id: job.id.clone(),
            job_type: job.job_type.clone().unwrap_or_default(),
            state: job.state.clone().unwrap_or_default(),
            district: job.district.clone().unwrap_or_default(),
            company: job.company.clone().unwrap_or_default(),
            body: job.summary(),
            category: NotificationCategory::NewJob,
        }
    }

    /// Document fields; `createdAt` is assigned by the store
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), self.title.into());
        fields.insert("jobId".to_string(), self.job_id.into());
        fields.insert("jobType".to_string(), self.job_type.into());
        fields.insert("state".to_string(), self.state.into());
        fields.insert("district".to_string(), self.district.into());
        fields.insert("company".to_string(), self.company.into());
        fields.insert("body".to_string(), self.body.into());
        fields.insert("type".to_string(), self.category.as_str().into());
        fields.insert("createdAt".to_string(), FieldValue::ServerTimestamp);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(pairs: &[(&str, &str)]) -> JobRecord {
        let fields: Fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect();
        JobRecord::from_fields("job-1", &fields)
    }

    #[test]
    fn test_location_variants() {
        assert_eq!(format_location("Pune", "MH"), "Pune, MH");
        assert_eq!(format_location("Pune", ""), "Pune");
        assert_eq!(format_location("", "MH"), "MH");
        assert_eq!(format_location("", ""), "Location N/A");
    }

    #[test]
    fn test_summary_matches_broadcast_body() {
        let job = job(&[
            ("title", "Clerk"),
            ("district", "Pune"),
            ("state", "MH"),
            ("jobType", "Full-time"),
        ]);
        assert_eq!(job.location(), "Pune, MH");
        assert_eq!(job.summary(), "Pune, MH • Full-time");
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let job = job(&[("title", ""), ("district", ""), ("state", ""), ("posterId", "")]);
        assert_eq!(job.display_title(), DEFAULT_JOB_TITLE);
        assert_eq!(job.location(), LOCATION_PLACEHOLDER);
        assert!(job.poster_id.is_none());
    }

    #[test]
    fn test_history_record_fields() {
        let job = job(&[
            ("title", "Clerk"),
            ("company", "Acme"),
            ("district", "Pune"),
            ("state", "MH"),
            ("jobType", "Full-time"),
        ]);

        let fields = NotificationHistoryRecord::for_new_job(&job).into_fields();
        assert_eq!(fields["title"], FieldValue::from("Clerk"));
        assert_eq!(fields["jobId"], FieldValue::from("job-1"));
        assert_eq!(fields["company"], FieldValue::from("Acme"));
        assert_eq!(fields["body"], FieldValue::from("Pune, MH • Full-time"));
        assert_eq!(fields["type"], FieldValue::from("new_job"));
        assert_eq!(fields["createdAt"], FieldValue::ServerTimestamp);
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&NotificationCategory::ExpirationWarning).unwrap(),
            "\"expiration_warning\""
        );
        assert_eq!(NotificationCategory::Application.as_str(), "application");
    }
}
