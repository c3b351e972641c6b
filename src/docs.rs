use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use slate_core::{ErrorBody, ErrorCode, ErrorResponse};
use slate_models::{
    AuditRecord, BulkEnrollDto, BulkEnrollFailure, BulkEnrollOutcome, ChangeRoleDto, Course,
    CourseStats, CreateCourseDto, EnrollStudentDto, Enrollment, Principal, Role, StudentProfile,
    StudentStatus,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::enrollments::controller::enroll_student,
        crate::modules::enrollments::controller::bulk_enroll,
        crate::modules::enrollments::controller::course_stats,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::deactivate_course,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::delete_student,
        crate::modules::principals::controller::change_role,
        crate::modules::audit::controller::list_audit,
    ),
    components(
        schemas(
            Enrollment,
            EnrollStudentDto,
            BulkEnrollDto,
            BulkEnrollFailure,
            BulkEnrollOutcome,
            Course,
            CourseStats,
            CreateCourseDto,
            StudentProfile,
            StudentStatus,
            Principal,
            Role,
            ChangeRoleDto,
            AuditRecord,
            ErrorResponse,
            ErrorBody,
            ErrorCode,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Enrollments", description = "Student enrollment endpoints"),
        (name = "Courses", description = "Course administration endpoints"),
        (name = "Students", description = "Student profile endpoints"),
        (name = "Principals", description = "Principal role management"),
        (name = "Audit", description = "Audit trail queries")
    ),
    info(
        title = "Slate API",
        version = "0.1.0",
        description = "School management API: role-based authorization and transactional course enrollment.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
