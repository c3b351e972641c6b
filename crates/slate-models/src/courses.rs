//! Course domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{ClassGroupId, CourseId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub title: String,
    /// When set, only students in this class group may enroll.
    pub class_group_id: Option<ClassGroupId>,
    pub capacity: i32,
    pub enrollment_count: i32,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.enrollment_count >= self.capacity
    }

    pub fn available_seats(&self) -> i32 {
        (self.capacity - self.enrollment_count).max(0)
    }

    pub fn stats(&self) -> CourseStats {
        CourseStats {
            course_id: self.id,
            capacity: self.capacity,
            enrollment_count: self.enrollment_count,
            available_seats: self.available_seats(),
            is_full: self.is_full(),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0, max = 10000))]
    pub capacity: i32,
    #[serde(default)]
    pub class_group_id: Option<ClassGroupId>,
}

impl CreateCourseDto {
    pub fn into_course(self) -> Course {
        let now = Utc::now();
        Course {
            id: CourseId::new(),
            code: self.code,
            title: self.title,
            class_group_id: self.class_group_id,
            capacity: self.capacity,
            enrollment_count: 0,
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CourseStats {
    pub course_id: CourseId,
    pub capacity: i32,
    pub enrollment_count: i32,
    pub available_seats: i32,
    pub is_full: bool,
    pub is_active: bool,
}
