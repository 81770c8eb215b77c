//! Users and the role-checked identities services act on behalf of.
//!
//! # Invariants
//! - A `Student` or `Coordinator` value only exists after a role check,
//!   so service signatures encode which role may call them.

use crate::model::reference::CourseId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Coordinator,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Coordinator => "coordinator",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "coordinator" => Some(Self::Coordinator),
            _ => None,
        }
    }
}

/// Shape errors for a user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    InvalidEmail(String),
    /// Only students declare a course.
    CoordinatorWithCourse,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email: `{value}`"),
            Self::CoordinatorWithCourse => write!(f, "coordinators cannot declare a course"),
        }
    }
}

impl Error for UserValidationError {}

/// Persisted account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Declared program; meaningful for students only.
    pub course_id: Option<CourseId>,
}

impl User {
    pub fn student(
        email: impl Into<String>,
        name: impl Into<String>,
        course_id: Option<CourseId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role: UserRole::Student,
            course_id,
        }
    }

    pub fn coordinator(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role: UserRole::Coordinator,
            course_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }
        if self.role == UserRole::Coordinator && self.course_id.is_some() {
            return Err(UserValidationError::CoordinatorWithCourse);
        }
        Ok(())
    }

    /// Narrows to a student identity when the role matches.
    pub fn as_student(&self) -> Option<Student> {
        (self.role == UserRole::Student).then(|| Student {
            id: self.id,
            course_id: self.course_id,
        })
    }

    /// Narrows to a coordinator identity when the role matches.
    pub fn as_coordinator(&self) -> Option<Coordinator> {
        (self.role == UserRole::Coordinator).then_some(Coordinator { id: self.id })
    }
}

/// Resolved student identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Student {
    pub id: UserId,
    pub course_id: Option<CourseId>,
}

/// Resolved coordinator identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinator {
    pub id: UserId,
}
