use crate::domain::model::{Course, CourseCode, CourseFilter, Program};
use crate::domain::plan::{Plan, ProposalContext, ProposedPlan};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read-only reference data. Lookups never suspend.
pub trait Catalog: Send + Sync {
    fn get_course(&self, code: &CourseCode) -> Option<Course>;
    fn get_program(&self, code: &str) -> Option<Program>;
    fn list_courses(&self, filter: &CourseFilter) -> Vec<Course>;
}

/// External producer of candidate plans (typically a language model).
///
/// Output is untrusted: it may be wrong, incomplete, or different on every call.
/// `prior_errors` carries the violations found in the previous attempt.
#[async_trait]
pub trait PlanProposer: Send + Sync {
    async fn propose(&self, context: &ProposalContext, prior_errors: &[String])
        -> Result<ProposedPlan>;
}

/// Fingerprint-keyed store of valid plans. Implementations must be safe to
/// share between concurrent requests.
pub trait PlanCache: Send + Sync {
    fn get(&self, fingerprint: &str) -> Option<Plan>;
    fn put(&self, fingerprint: &str, plan: Plan);
    fn invalidate(&self, fingerprint: &str) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<T: Catalog + ?Sized> Catalog for std::sync::Arc<T> {
    fn get_course(&self, code: &CourseCode) -> Option<Course> {
        (**self).get_course(code)
    }

    fn get_program(&self, code: &str) -> Option<Program> {
        (**self).get_program(code)
    }

    fn list_courses(&self, filter: &CourseFilter) -> Vec<Course> {
        (**self).list_courses(filter)
    }
}
