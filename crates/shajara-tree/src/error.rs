//! Business-rule error types for member and account flows.

use shajara_core::error::ShajaraError;
use uuid::Uuid;

/// Member validation and consistency failures.
#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error(
        "First name, last name, gender, familyRelationship and family branch are required."
    )]
    MissingRequiredFields,

    #[error(
        "يوجد بالفعل عضو باسم '{full_name}'. يرجى اسم اضافى لتمييز فريد مثل '{full_name} 1'."
    )]
    DuplicateFullName { full_name: String },

    #[error("This family branch already has a male head ({head_name})")]
    BranchHeadExists { head_name: String },

    #[error("Family head (الجد الأعلى) must be male")]
    BranchHeadNotMale,

    #[error("One or more wives not found")]
    WivesNotFound,

    #[error("All wives must be female")]
    WifeNotFemale,

    #[error("Husband not found")]
    HusbandNotFound,

    #[error("Husband must be male")]
    HusbandNotMale,

    #[error("Husband must be from the same family branch")]
    HusbandWrongBranch,

    #[error("Father not found")]
    FatherNotFound,

    #[error("Father must be male")]
    FatherNotMale,

    #[error("Mother not found")]
    MotherNotFound,

    #[error("Mother must be female")]
    MotherNotFemale,

    #[error("One or more children not found")]
    ChildrenNotFound,

    #[error("Member not found")]
    NotFound { id: Uuid },
}

impl From<MemberError> for ShajaraError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::NotFound { id } => ShajaraError::NotFound {
                entity: "member".into(),
                id: id.to_string(),
            },
            MemberError::DuplicateFullName { .. } | MemberError::BranchHeadExists { .. } => {
                ShajaraError::Conflict {
                    message: err.to_string(),
                }
            }
            other => ShajaraError::Validation {
                message: other.to_string(),
            },
        }
    }
}

/// Account and password-reset flow failures.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid or expired password reset token")]
    ResetTokenInvalid,

    #[error("Password reset token has expired")]
    ResetTokenExpired,
}

impl From<AccountError> for ShajaraError {
    fn from(err: AccountError) -> Self {
        ShajaraError::Validation {
            message: err.to_string(),
        }
    }
}
