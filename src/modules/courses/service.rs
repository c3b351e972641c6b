use serde_json::json;
use tracing::{info, instrument};

use slate_cache::invalidate;
use slate_core::AppError;
use slate_models::{
    Action, AuditRecord, Course, CourseId, CreateCourseDto, Principal, ResourceType, actions,
};

use crate::modules::audit::service::AuditService;
use crate::state::AppState;

pub struct CourseService;

impl CourseService {
    #[instrument(skip(state, principal, dto), fields(principal_id = %principal.id, course.code = %dto.code))]
    pub async fn create_course(
        state: &AppState,
        principal: &Principal,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        state
            .authz
            .require(principal, ResourceType::Course, Action::Create, None)
            .await?;

        let course = dto.into_course();
        state.store.insert_course(&course).await?;
        info!(course.id = %course.id, "Course created");

        let record = AuditRecord::new(
            actions::COURSE_CREATED,
            Some(principal.id),
            Some(course.id.into_inner()),
            json!({ "code": course.code, "capacity": course.capacity }),
        );
        AuditService::record(state.audit.as_ref(), &record).await;

        Ok(course)
    }

    /// Stops new enrollments. Existing enrollments are kept as they are.
    #[instrument(skip(state, principal), fields(principal_id = %principal.id, course.id = %course_id))]
    pub async fn deactivate_course(
        state: &AppState,
        principal: &Principal,
        course_id: CourseId,
    ) -> Result<Course, AppError> {
        state
            .authz
            .require(principal, ResourceType::Course, Action::Update, None)
            .await?;

        let course = state.store.deactivate_course(course_id).await?;
        info!(enrollments = course.enrollment_count, "Course deactivated");

        let record = AuditRecord::new(
            actions::COURSE_DEACTIVATED,
            Some(principal.id),
            Some(course.id.into_inner()),
            json!({ "enrollment_count": course.enrollment_count }),
        );
        AuditService::record(state.audit.as_ref(), &record).await;
        invalidate::course_stats(state.cache.as_ref(), course.id.into_inner()).await;

        Ok(course)
    }
}
