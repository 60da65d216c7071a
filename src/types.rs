use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountProvider {
    Credentials,
    Google,
    Github,
}

impl AccountProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountProvider::Credentials => "credentials",
            AccountProvider::Google => "google",
            AccountProvider::Github => "github",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credentials" => Some(AccountProvider::Credentials),
            "google" => Some(AccountProvider::Google),
            "github" => Some(AccountProvider::Github),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTag {
    Beginner,
    Intermediate,
    Advance,
    Expert,
}

impl DifficultyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTag::Beginner => "beginner",
            DifficultyTag::Intermediate => "intermediate",
            DifficultyTag::Advance => "advance",
            DifficultyTag::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(DifficultyTag::Beginner),
            "intermediate" => Some(DifficultyTag::Intermediate),
            "advance" => Some(DifficultyTag::Advance),
            "expert" => Some(DifficultyTag::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
    Pending,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            "pending" => Some(ApprovalStatus::Pending),
            _ => None,
        }
    }
}

/// Status of a user's attempt at a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Accepted,
    Rejected,
    Pending,
    Submitted,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Accepted => "accepted",
            ChallengeStatus::Rejected => "rejected",
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Submitted => "submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(ChallengeStatus::Accepted),
            "rejected" => Some(ChallengeStatus::Rejected),
            "pending" => Some(ChallengeStatus::Pending),
            "submitted" => Some(ChallengeStatus::Submitted),
            _ => None,
        }
    }
}

// User DTOs

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDto {
    pub about: Option<String>,
    pub image_url: Option<String>,
}

/// Public user representation. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOutput {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub profile: Option<ProfileDto>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `username` may also carry the e-mail address.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

// Challenge DTOs

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDto {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorDto {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub difficulty_tag: DifficultyTag,
    pub topic_tags: Vec<TopicDto>,
    pub contributor: ContributorDto,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributedChallengeInfo {
    #[serde(flatten)]
    pub info: ChallengeInfo,
    pub approval: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeOutput {
    #[serde(flatten)]
    pub info: ChallengeInfo,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedChallengeInfo {
    pub data: Vec<ChallengeInfo>,
    #[serde(rename = "hasPrev")]
    pub has_prev: bool,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChallengeInput {
    pub title: String,
    pub description: String,
    pub difficulty_tag: DifficultyTag,
    #[serde(default)]
    pub topic_tags: Vec<TopicDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakeChallengeRequest {
    pub challenge_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeSolutionInput {
    pub challenge_id: Uuid,
    pub github_url: String,
    pub presentation_video_url: String,
    pub deployed_application_url: Option<String>,
}

/// A row from the takers table, as shown to the taking user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakenChallengeState {
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub status: ChallengeStatus,
    pub github_url: Option<String>,
    pub presentation_video_url: Option<String>,
    pub deployed_application_url: Option<String>,
    pub feedback: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewChallengeOutput {
    pub challenge: ChallengeOutput,
    pub accepted_challenge: Option<TakenChallengeState>,
}

/// A challenge together with the user's submission state, for the
/// "taken by user" listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeTaken {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub difficulty_tag: DifficultyTag,
    pub topic_tags: Vec<TopicDto>,
    pub status: ChallengeStatus,
    pub github_url: Option<String>,
    pub presentation_video_url: Option<String>,
    pub deployed_application_url: Option<String>,
}
