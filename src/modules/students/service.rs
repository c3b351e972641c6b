use serde_json::json;
use tracing::{debug, info, instrument};

use slate_core::AppError;
use slate_models::{Action, AuditRecord, Principal, ResourceType, StudentId, StudentProfile, actions};

use crate::modules::audit::service::AuditService;
use crate::state::AppState;

pub struct StudentService;

impl StudentService {
    /// Students may read only their own profile; the ownership override
    /// roles (Admin by default) may read any.
    #[instrument(skip(state, principal), fields(principal_id = %principal.id, student.id = %student_id))]
    pub async fn get_student(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<StudentProfile, AppError> {
        // Role first: without read access a missing id and an existing one look the same.
        state
            .authz
            .require_role(principal, ResourceType::Student, Action::Read)
            .await?;

        let student = state
            .store
            .find_student(student_id)
            .await?
            .filter(|student| student.is_live())
            .ok_or_else(|| {
                debug!("Student not found");
                AppError::not_found("Student not found")
            })?;

        state
            .authz
            .require(principal, ResourceType::Student, Action::Read, Some(&student))
            .await?;

        Ok(student)
    }

    #[instrument(skip(state, principal), fields(principal_id = %principal.id, student.id = %student_id))]
    pub async fn soft_delete_student(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<(), AppError> {
        state
            .authz
            .require(principal, ResourceType::Student, Action::Delete, None)
            .await?;

        let student = state.store.soft_delete_student(student_id, principal.id).await?;
        info!(student.number = %student.student_number, "Student soft-deleted");

        let record = AuditRecord::new(
            actions::STUDENT_SOFT_DELETED,
            Some(principal.id),
            Some(student.id.into_inner()),
            json!({ "student_number": student.student_number }),
        );
        AuditService::record(state.audit.as_ref(), &record).await;

        Ok(())
    }
}
